use crate::{env::EnvManager, error::CliError};
use chrono::NaiveDate;
use connectors::{
    capability::{DataSink, DataSource},
    file::sheet::SheetSource,
    http::source::HttpApiSource,
    profile::{
        AnalyticalProfile, ApiProfile, ColumnRange, DEFAULT_ANALYTICAL_PORT, RelationalProfile,
        SheetProfile,
    },
    sql::{mysql::MySqlSource, postgres::PostgresTarget},
};
use engine::flow::{Bindings, EtlFlow, FlowSet, FlowSpec};
use std::{str::FromStr, sync::Arc, time::Duration};

const DEFAULT_BATCH_SIZE: usize = 5_000;
const DEFAULT_API_PAGE_SIZE: usize = 500;
const DEFAULT_API_TIMEOUT_SECS: u64 = 30;
const DEFAULT_SHEET_HEADER_ROW: usize = 2;
const PRIMARY_FLOW: &str = "final";
const STAGING_FLOW: &str = "staging";

/// Which backend feeds the flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Sql,
    Api,
    Sheet,
}

impl FromStr for SourceKind {
    type Err = CliError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sql" => Ok(SourceKind::Sql),
            "api" => Ok(SourceKind::Api),
            "sheet" | "spreadsheet" => Ok(SourceKind::Sheet),
            other => Err(CliError::Config(format!(
                "SOURCE_KIND '{other}' is not one of sql|api|sheet"
            ))),
        }
    }
}

/// Everything the process needs, resolved once from the environment at
/// startup. Profiles are immutable from here on.
#[derive(Debug)]
pub struct AppConfig {
    pub source_kind: SourceKind,
    pub analytical: Option<AnalyticalProfile>,
    pub sheet: Option<SheetProfile>,
    pub api: Option<ApiProfile>,
    pub target: RelationalProfile,
    pub flows: Vec<FlowSpec>,
}

impl AppConfig {
    pub fn from_env(env: &EnvManager) -> Result<Self, CliError> {
        let source_kind: SourceKind = optional(env, "SOURCE_KIND").unwrap_or("sql").parse()?;

        let analytical = match source_kind {
            SourceKind::Sql => Some(analytical_profile(env)?),
            _ => None,
        };
        let sheet = match source_kind {
            SourceKind::Sheet => Some(sheet_profile(env)?),
            _ => None,
        };
        let api = match source_kind {
            SourceKind::Api => Some(api_profile(env)?),
            _ => None,
        };

        Ok(AppConfig {
            source_kind,
            analytical,
            sheet,
            api,
            target: target_profile(env)?,
            flows: flow_specs(env, source_kind)?,
        })
    }

    pub fn build_source(&self) -> Result<Arc<dyn DataSource>, CliError> {
        match self.source_kind {
            SourceKind::Sql => {
                let profile = self.analytical.clone().expect("checked at construction");
                Ok(Arc::new(MySqlSource::new(profile)))
            }
            SourceKind::Sheet => {
                let profile = self.sheet.clone().expect("checked at construction");
                Ok(Arc::new(SheetSource::new(profile)))
            }
            SourceKind::Api => {
                let profile = self.api.clone().expect("checked at construction");
                Ok(Arc::new(HttpApiSource::new(profile)?))
            }
        }
    }

    pub fn build_target(&self) -> Result<Arc<dyn DataSink>, CliError> {
        Ok(Arc::new(PostgresTarget::new(self.target.clone())?))
    }

    pub fn build_flow_set(&self) -> Result<FlowSet, CliError> {
        let bindings = Bindings {
            source: self.build_source()?,
            target: self.build_target()?,
        };

        let mut set = FlowSet::new();
        for spec in &self.flows {
            set = set.register(EtlFlow::new(spec.clone(), bindings.clone()));
        }
        Ok(set)
    }
}

/// A set-but-empty variable counts as unset.
fn optional<'a>(env: &'a EnvManager, key: &str) -> Option<&'a str> {
    env.get(key).map(str::trim).filter(|v| !v.is_empty())
}

fn required(env: &EnvManager, key: &str) -> Result<String, CliError> {
    optional(env, key)
        .map(str::to_string)
        .ok_or_else(|| CliError::Config(format!("missing required environment variable {key}")))
}

fn parsed<T: FromStr>(env: &EnvManager, key: &str, default: T) -> Result<T, CliError> {
    match optional(env, key) {
        Some(raw) => raw
            .parse()
            .map_err(|_| CliError::Config(format!("invalid value '{raw}' for {key}"))),
        None => Ok(default),
    }
}

fn analytical_profile(env: &EnvManager) -> Result<AnalyticalProfile, CliError> {
    let mut profile = AnalyticalProfile::new(
        &required(env, "SRC_HOST")?,
        &required(env, "SRC_USER")?,
        &required(env, "SRC_PASS")?,
    )
    .with_port(parsed(env, "SRC_PORT", DEFAULT_ANALYTICAL_PORT)?);

    if let Some(database) = optional(env, "SRC_DB") {
        profile = profile.with_database(database);
    }
    Ok(profile)
}

fn target_profile(env: &EnvManager) -> Result<RelationalProfile, CliError> {
    Ok(RelationalProfile {
        host: required(env, "TGT_HOST")?,
        user: required(env, "TGT_USER")?,
        password: required(env, "TGT_PASS")?,
        driver: optional(env, "TGT_DRIVER").unwrap_or("postgres").to_string(),
        database: required(env, "TGT_DB")?,
    })
}

fn sheet_profile(env: &EnvManager) -> Result<SheetProfile, CliError> {
    let mut profile = SheetProfile::new(required(env, "SHEET_PATH")?)
        .with_header_row(parsed(env, "SHEET_HEADER_ROW", DEFAULT_SHEET_HEADER_ROW)?);

    if let Some(selector) = optional(env, "SHEET_COLUMNS") {
        profile = profile.with_columns(ColumnRange::parse(selector)?);
    }
    Ok(profile)
}

fn api_profile(env: &EnvManager) -> Result<ApiProfile, CliError> {
    let raw_date = required(env, "API_START_DATE")?;
    let start_date = NaiveDate::parse_from_str(&raw_date, "%Y-%m-%d").map_err(|_| {
        CliError::Config(format!(
            "invalid API_START_DATE '{raw_date}', expected YYYY-MM-DD"
        ))
    })?;

    Ok(
        ApiProfile::new(&required(env, "API_BASE_URL")?, start_date)
            .with_page_size(parsed(env, "API_PAGE_SIZE", DEFAULT_API_PAGE_SIZE)?)
            .with_timeout(Duration::from_secs(parsed(
                env,
                "API_TIMEOUT_SECS",
                DEFAULT_API_TIMEOUT_SECS,
            )?)),
    )
}

fn flow_specs(env: &EnvManager, source_kind: SourceKind) -> Result<Vec<FlowSpec>, CliError> {
    // Non-SQL sources carry their query surface in the profile, so the
    // extract query may be empty for them.
    let extract_query = match source_kind {
        SourceKind::Sql => required(env, "FLOW_QUERY")?,
        _ => optional(env, "FLOW_QUERY").unwrap_or_default().to_string(),
    };
    let batch_size = parsed(env, "BATCH_SIZE", DEFAULT_BATCH_SIZE)?;

    let mut flows = vec![FlowSpec {
        name: PRIMARY_FLOW.to_string(),
        extract_query,
        target_table: required(env, "FLOW_TABLE")?,
        batch_size,
    }];

    match (optional(env, "STAGING_QUERY"), optional(env, "STAGING_TABLE")) {
        (Some(query), Some(table)) => flows.push(FlowSpec {
            name: STAGING_FLOW.to_string(),
            extract_query: query.to_string(),
            target_table: table.to_string(),
            batch_size,
        }),
        (None, None) => {}
        _ => {
            return Err(CliError::Config(
                "STAGING_QUERY and STAGING_TABLE must be set together".into(),
            ));
        }
    }

    Ok(flows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> EnvManager {
        let mut env = EnvManager::default();
        // Shield the assertions from whatever the process env carries.
        for key in [
            "SOURCE_KIND",
            "SRC_HOST",
            "SRC_PORT",
            "SRC_USER",
            "SRC_PASS",
            "SRC_DB",
            "TGT_HOST",
            "TGT_USER",
            "TGT_PASS",
            "TGT_DRIVER",
            "TGT_DB",
            "SHEET_PATH",
            "SHEET_HEADER_ROW",
            "SHEET_COLUMNS",
            "API_BASE_URL",
            "API_START_DATE",
            "API_PAGE_SIZE",
            "API_TIMEOUT_SECS",
            "FLOW_QUERY",
            "FLOW_TABLE",
            "BATCH_SIZE",
            "STAGING_QUERY",
            "STAGING_TABLE",
        ] {
            env.set(key, "");
        }
        for (key, value) in pairs {
            env.set(key, value);
        }
        env
    }

    fn sql_env() -> EnvManager {
        env(&[
            ("SRC_HOST", "src.local"),
            ("SRC_USER", "reader"),
            ("SRC_PASS", "pw"),
            ("TGT_HOST", "tgt.local"),
            ("TGT_USER", "loader"),
            ("TGT_PASS", "pw"),
            ("TGT_DB", "warehouse"),
            ("FLOW_QUERY", "SELECT * FROM sales"),
            ("FLOW_TABLE", "sales_reload"),
        ])
    }

    #[test]
    fn sql_source_with_defaults() {
        let config = AppConfig::from_env(&sql_env()).unwrap();

        assert_eq!(config.source_kind, SourceKind::Sql);
        let analytical = config.analytical.unwrap();
        assert_eq!(analytical.port, 30015);
        assert_eq!(config.target.driver, "postgres");
        assert_eq!(config.flows.len(), 1);
        assert_eq!(config.flows[0].name, "final");
        assert_eq!(config.flows[0].batch_size, 5_000);
    }

    #[test]
    fn staging_flow_requires_both_variables() {
        let mut vars = sql_env();
        vars.set("STAGING_QUERY", "SELECT * FROM sales_raw");
        let err = AppConfig::from_env(&vars).unwrap_err();
        assert!(err.to_string().contains("STAGING_TABLE"));

        vars.set("STAGING_TABLE", "sales_stage");
        let config = AppConfig::from_env(&vars).unwrap();
        assert_eq!(config.flows.len(), 2);
        assert_eq!(config.flows[1].name, "staging");
        assert_eq!(config.flows[1].target_table, "sales_stage");
    }

    #[test]
    fn missing_required_variable_is_reported_by_name() {
        let mut vars = sql_env();
        vars.set("TGT_DB", "");
        let err = AppConfig::from_env(&vars).unwrap_err();
        assert!(err.to_string().contains("TGT_DB"));
    }

    #[test]
    fn api_source_parses_date_and_numbers() {
        let vars = env(&[
            ("SOURCE_KIND", "api"),
            ("API_BASE_URL", "http://api.test/items"),
            ("API_START_DATE", "2024-06-01"),
            ("API_PAGE_SIZE", "100"),
            ("TGT_HOST", "tgt.local"),
            ("TGT_USER", "loader"),
            ("TGT_PASS", "pw"),
            ("TGT_DB", "warehouse"),
            ("FLOW_TABLE", "api_reload"),
        ]);

        let config = AppConfig::from_env(&vars).unwrap();
        let api = config.api.unwrap();
        assert_eq!(api.page_size, 100);
        assert_eq!(
            api.start_date,
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
        );
        assert_eq!(api.timeout, Duration::from_secs(30));
        // API flows may omit FLOW_QUERY.
        assert_eq!(config.flows[0].extract_query, "");
    }

    #[test]
    fn invalid_source_kind_is_rejected() {
        let vars = env(&[("SOURCE_KIND", "ftp")]);
        assert!(AppConfig::from_env(&vars).is_err());
    }

    #[test]
    fn sheet_source_parses_column_range() {
        let vars = env(&[
            ("SOURCE_KIND", "sheet"),
            ("SHEET_PATH", "/data/extract.csv"),
            ("SHEET_HEADER_ROW", "2"),
            ("SHEET_COLUMNS", "B:F"),
            ("TGT_HOST", "tgt.local"),
            ("TGT_USER", "loader"),
            ("TGT_PASS", "pw"),
            ("TGT_DB", "warehouse"),
            ("FLOW_TABLE", "sheet_reload"),
        ]);

        let config = AppConfig::from_env(&vars).unwrap();
        let sheet = config.sheet.unwrap();
        assert_eq!(sheet.header_row, 2);
        assert_eq!(sheet.columns, Some(ColumnRange { start: 1, end: 5 }));
    }
}
