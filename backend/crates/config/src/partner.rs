use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tempora_common::error::{TemporaError, TemporaResult};

use crate::env::{get_parsed_or, get_var_or, non_blank_var};

/// Organizations synced when `PARTNER_ORGANIZATIONS` is not set.
pub const DEFAULT_ORGANIZATIONS: &str =
    "41=Sinergia Consulenze,410=Sinergia EPC,411=Impronta,412=Deep Reality";

const REQUIRED_VARS: [&str; 4] = [
    "PARTNER_CLIENT_ID",
    "PARTNER_CLIENT_SECRET",
    "PARTNER_TOKEN_URL",
    "PARTNER_API_BASE_URL",
];

/// One partner-side organization known to the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationEntry {
    pub code: String,
    pub name: String,
}

/// Credentials and endpoints for the partner API.
#[derive(Debug)]
pub struct PartnerConfig {
    pub client_id: String,
    pub client_secret: SecretString,
    pub token_url: String,
    pub api_base_url: String,
    pub token_timeout_secs: u64,
    pub timeout_secs: u64,
    pub organizations: Vec<OrganizationEntry>,
}

impl PartnerConfig {
    /// Load partner settings from the environment.
    ///
    /// Fails with a single `Config` error naming every missing credential,
    /// so a misconfigured deployment is caught at startup.
    pub fn from_env() -> TemporaResult<Self> {
        let missing: Vec<&str> = REQUIRED_VARS
            .iter()
            .copied()
            .filter(|key| non_blank_var(key).is_none())
            .collect();

        if !missing.is_empty() {
            return Err(TemporaError::Config(format!(
                "missing required environment variables: {}",
                missing.join(", ")
            )));
        }

        let required = |key: &str| non_blank_var(key).unwrap_or_default();

        Ok(Self {
            client_id: required("PARTNER_CLIENT_ID"),
            client_secret: SecretString::from(required("PARTNER_CLIENT_SECRET")),
            token_url: required("PARTNER_TOKEN_URL"),
            api_base_url: required("PARTNER_API_BASE_URL")
                .trim_end_matches('/')
                .to_owned(),
            token_timeout_secs: get_parsed_or("PARTNER_TOKEN_TIMEOUT_SECS", 10)?,
            timeout_secs: get_parsed_or("PARTNER_TIMEOUT_SECS", 15)?,
            organizations: parse_organizations(&get_var_or(
                "PARTNER_ORGANIZATIONS",
                DEFAULT_ORGANIZATIONS,
            ))?,
        })
    }
}

/// Parse a `code=name,code=name` catalog list.
///
/// Codes must be unique and neither side may be blank.
pub fn parse_organizations(raw: &str) -> TemporaResult<Vec<OrganizationEntry>> {
    let mut entries: Vec<OrganizationEntry> = Vec::new();

    for item in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (code, name) = item.split_once('=').ok_or_else(|| {
            TemporaError::Config(format!(
                "invalid PARTNER_ORGANIZATIONS entry '{item}', expected code=name"
            ))
        })?;
        let (code, name) = (code.trim(), name.trim());

        if code.is_empty() || name.is_empty() {
            return Err(TemporaError::Config(format!(
                "invalid PARTNER_ORGANIZATIONS entry '{item}', code and name must be set"
            )));
        }
        if entries.iter().any(|e| e.code == code) {
            return Err(TemporaError::Config(format!(
                "duplicate organization code '{code}' in PARTNER_ORGANIZATIONS"
            )));
        }

        entries.push(OrganizationEntry {
            code: code.to_owned(),
            name: name.to_owned(),
        });
    }

    if entries.is_empty() {
        return Err(TemporaError::Config(
            "PARTNER_ORGANIZATIONS is set but contains no organizations".to_owned(),
        ));
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::{clear_partner_vars, set_partner_vars, ENV_LOCK};
    use secrecy::ExposeSecret;
    use std::env;

    #[test]
    fn default_catalog_has_four_codes() {
        let orgs = parse_organizations(DEFAULT_ORGANIZATIONS).unwrap();
        let codes: Vec<&str> = orgs.iter().map(|o| o.code.as_str()).collect();
        assert_eq!(codes, vec!["41", "410", "411", "412"]);
        assert_eq!(orgs[0].name, "Sinergia Consulenze");
    }

    #[test]
    fn catalog_trims_whitespace() {
        let orgs = parse_organizations(" 7 = Acme , 8=Globex ").unwrap();
        assert_eq!(
            orgs,
            vec![
                OrganizationEntry {
                    code: "7".into(),
                    name: "Acme".into()
                },
                OrganizationEntry {
                    code: "8".into(),
                    name: "Globex".into()
                },
            ]
        );
    }

    #[test]
    fn catalog_rejects_missing_separator() {
        let err = parse_organizations("41 Sinergia").unwrap_err();
        assert!(err.to_string().contains("expected code=name"), "got: {err}");
    }

    #[test]
    fn catalog_rejects_duplicate_codes() {
        let err = parse_organizations("41=A,41=B").unwrap_err();
        assert!(err.to_string().contains("duplicate"), "got: {err}");
    }

    #[test]
    fn catalog_rejects_empty_list() {
        assert!(parse_organizations(" , ,").is_err());
    }

    #[test]
    fn from_env_reports_every_missing_var() {
        let _g = ENV_LOCK.lock().unwrap();
        clear_partner_vars();
        env::set_var("PARTNER_CLIENT_ID", "id");

        let err = PartnerConfig::from_env().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("PARTNER_CLIENT_SECRET"), "got: {msg}");
        assert!(msg.contains("PARTNER_TOKEN_URL"), "got: {msg}");
        assert!(msg.contains("PARTNER_API_BASE_URL"), "got: {msg}");
        assert!(!msg.contains("PARTNER_CLIENT_ID"), "got: {msg}");

        clear_partner_vars();
    }

    #[test]
    fn from_env_applies_defaults() {
        let _g = ENV_LOCK.lock().unwrap();
        clear_partner_vars();
        set_partner_vars();
        env::set_var("PARTNER_API_BASE_URL", "https://api.example.com/");

        let cfg = PartnerConfig::from_env().unwrap();
        assert_eq!(cfg.client_secret.expose_secret(), "client-secret");
        assert_eq!(cfg.api_base_url, "https://api.example.com");
        assert_eq!(cfg.token_timeout_secs, 10);
        assert_eq!(cfg.timeout_secs, 15);
        assert_eq!(cfg.organizations.len(), 4);

        clear_partner_vars();
    }

    #[test]
    fn from_env_reads_custom_catalog_and_timeouts() {
        let _g = ENV_LOCK.lock().unwrap();
        clear_partner_vars();
        set_partner_vars();
        env::set_var("PARTNER_ORGANIZATIONS", "99=Test Org");
        env::set_var("PARTNER_TIMEOUT_SECS", "30");

        let cfg = PartnerConfig::from_env().unwrap();
        assert_eq!(cfg.timeout_secs, 30);
        assert_eq!(cfg.organizations.len(), 1);
        assert_eq!(cfg.organizations[0].code, "99");

        clear_partner_vars();
    }

    #[test]
    fn debug_output_redacts_secret() {
        let _g = ENV_LOCK.lock().unwrap();
        clear_partner_vars();
        set_partner_vars();

        let cfg = PartnerConfig::from_env().unwrap();
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("client-secret"), "got: {rendered}");

        clear_partner_vars();
    }
}
