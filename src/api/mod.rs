use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::core::{
    DEFAULT_HORIZON_YEARS, DEFAULT_PROJECTION_YEARS, Locale, MAX_HORIZON_YEARS,
    MAX_PROJECTION_YEARS, ProjectionConfig, ProjectionInput, ProjectionPoint, TierLabel,
    calculate_projection, format_duration,
};
use crate::reference::{
    CityRegistry, DEFAULT_CLOSEST_PENSIONS, HouseholdType, ReferenceError, builtin_pensions,
    closest_pensions,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliHousehold {
    Single,
    Dink,
    TwoChildren,
}

impl From<CliHousehold> for HouseholdType {
    fn from(value: CliHousehold) -> Self {
        match value {
            CliHousehold::Single => HouseholdType::Single,
            CliHousehold::Dink => HouseholdType::Dink,
            CliHousehold::TwoChildren => HouseholdType::TwoChildren,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ApiHousehold {
    Single,
    #[serde(alias = "DINK")]
    Dink,
    #[serde(alias = "twoChildren", alias = "two-children")]
    TwoChildren,
}

impl From<ApiHousehold> for CliHousehold {
    fn from(value: ApiHousehold) -> Self {
        match value {
            ApiHousehold::Single => CliHousehold::Single,
            ApiHousehold::Dink => CliHousehold::Dink,
            ApiHousehold::TwoChildren => CliHousehold::TwoChildren,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProjectPayload {
    target: Option<f64>,
    current: Option<f64>,
    monthly_contribution: Option<f64>,
    annual_bonus: Option<f64>,
    annual_return: Option<f64>,
    fire_ratio: Option<f64>,
    inflation_rate: Option<f64>,
    horizon_years: Option<u32>,
    projection_years: Option<u32>,
    language: Option<String>,
    city: Option<String>,
    household: Option<ApiHousehold>,
    pension_count: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LanguageQuery {
    language: Option<String>,
}

#[derive(Parser, Debug)]
#[command(
    name = "eazy-fire",
    about = "FIRE trajectory: months to target, post-target projection and local wealth tier"
)]
struct Cli {
    #[arg(long, default_value_t = 420_000.0, help = "Target net worth")]
    target: f64,
    #[arg(long, default_value_t = 72_800.0, help = "Current savings")]
    current: f64,
    #[arg(long, default_value_t = 2_240.0)]
    monthly_contribution: f64,
    #[arg(
        long,
        default_value_t = 11_200.0,
        help = "Bonus saved at the end of every simulated year"
    )]
    annual_bonus: f64,
    #[arg(
        long,
        default_value_t = 7.0,
        allow_negative_numbers = true,
        help = "Expected annual return in percent, e.g. 7"
    )]
    annual_return: f64,
    #[arg(
        long,
        default_value_t = 3.6,
        help = "Share of the target spent every year after FIRE, in percent"
    )]
    fire_ratio: f64,
    #[arg(
        long,
        default_value_t = 3.0,
        allow_negative_numbers = true,
        help = "Annual inflation in percent"
    )]
    inflation_rate: f64,
    #[arg(
        long,
        default_value_t = DEFAULT_HORIZON_YEARS,
        help = "Years to simulate before reporting the target as unreached"
    )]
    horizon_years: u32,
    #[arg(
        long,
        default_value_t = DEFAULT_PROJECTION_YEARS,
        help = "Years projected after the target is reached"
    )]
    projection_years: u32,
    #[arg(long, default_value = Locale::DEFAULT_TAG, help = "Language tag, e.g. CN or EN")]
    language: String,
    #[arg(long, help = "City key for the wealth tier, e.g. chiang_mai")]
    city: Option<String>,
    #[arg(long, value_enum)]
    household: Option<CliHousehold>,
    #[arg(long, default_value_t = DEFAULT_CLOSEST_PENSIONS)]
    pension_count: usize,
}

#[derive(Debug)]
struct IncomeQuery {
    city: String,
    household: HouseholdType,
}

#[derive(Debug)]
struct ProjectRequest {
    input: ProjectionInput,
    config: ProjectionConfig,
    language: Locale,
    income: Option<IncomeQuery>,
    pension_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PensionView {
    label: String,
    annual_pension: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct IncomeLevelView {
    city: String,
    city_name: String,
    household: HouseholdType,
    tier: TierLabel,
    level: String,
    description: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectResponse {
    language: Locale,
    months_to_target: Option<u32>,
    duration: String,
    annual_spending: f64,
    monthly_spending: f64,
    inflation_rate: f64,
    horizon_years: u32,
    projection_years: u32,
    series: Vec<ProjectionPoint>,
    closest_pensions: Vec<PensionView>,
    income_level: Option<IncomeLevelView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CityNoteView {
    author: String,
    date: String,
    content: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CityView {
    key: String,
    name: String,
    households: Vec<HouseholdType>,
    notes: Vec<CityNoteView>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug)]
enum RequestError {
    Invalid(String),
    Data(ReferenceError),
}

impl RequestError {
    fn status(&self) -> StatusCode {
        match self {
            RequestError::Invalid(_) => StatusCode::BAD_REQUEST,
            RequestError::Data(ReferenceError::UnknownCity(_))
            | RequestError::Data(ReferenceError::MissingHousehold { .. }) => {
                StatusCode::BAD_REQUEST
            }
            RequestError::Data(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            RequestError::Invalid(msg) => msg.clone(),
            RequestError::Data(e) => e.to_string(),
        }
    }
}

impl From<ReferenceError> for RequestError {
    fn from(value: ReferenceError) -> Self {
        RequestError::Data(value)
    }
}

fn build_request(cli: Cli) -> Result<ProjectRequest, String> {
    if !cli.annual_return.is_finite() || cli.annual_return <= -100.0 {
        return Err("--annual-return must be > -100".to_string());
    }

    if !cli.inflation_rate.is_finite() || cli.inflation_rate <= -100.0 {
        return Err("--inflation-rate must be > -100".to_string());
    }

    if !cli.fire_ratio.is_finite() || cli.fire_ratio < 0.0 {
        return Err("--fire-ratio must be >= 0".to_string());
    }

    for (name, value) in [
        ("--target", cli.target),
        ("--current", cli.current),
        ("--monthly-contribution", cli.monthly_contribution),
        ("--annual-bonus", cli.annual_bonus),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(format!("{name} must be >= 0"));
        }
    }

    if cli.horizon_years == 0 || cli.horizon_years > MAX_HORIZON_YEARS {
        return Err(format!(
            "--horizon-years must be between 1 and {MAX_HORIZON_YEARS}"
        ));
    }

    if cli.projection_years == 0 || cli.projection_years > MAX_PROJECTION_YEARS {
        return Err(format!(
            "--projection-years must be between 1 and {MAX_PROJECTION_YEARS}"
        ));
    }

    let language = Locale::new(&cli.language).map_err(|e| format!("--language: {e}"))?;

    let income = match (cli.city, cli.household) {
        (Some(city), Some(household)) => Some(IncomeQuery {
            city,
            household: household.into(),
        }),
        (None, None) => None,
        _ => return Err("--city and --household must be given together".to_string()),
    };

    let input = ProjectionInput {
        target_net_worth: cli.target,
        current_balance: cli.current,
        monthly_contribution: cli.monthly_contribution,
        annual_bonus: cli.annual_bonus,
        annual_return_rate: cli.annual_return / 100.0,
        fire_spend_ratio: cli.fire_ratio / 100.0,
    };
    let config = ProjectionConfig {
        horizon_years: cli.horizon_years,
        projection_years: cli.projection_years,
        inflation_rate: cli.inflation_rate / 100.0,
    };
    input.validate().map_err(|e| e.to_string())?;
    config.validate().map_err(|e| e.to_string())?;

    Ok(ProjectRequest {
        input,
        config,
        language,
        income,
        pension_count: cli.pension_count,
    })
}

pub fn run_cli() -> Result<(), String> {
    let cli = Cli::parse();
    let request = build_request(cli)?;
    let response = build_project_response(&request).map_err(|e| e.message())?;
    let json = serde_json::to_string_pretty(&response)
        .map_err(|e| format!("Failed to encode response: {e}"))?;
    println!("{json}");
    Ok(())
}

pub fn router() -> Router {
    Router::new()
        .route(
            "/api/project",
            get(project_get_handler).post(project_post_handler),
        )
        .route("/api/cities", get(cities_handler))
        .fallback(not_found_handler)
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    log::info!("FIRE HTTP API listening on http://{addr}");
    log::info!("Local access: http://127.0.0.1:{port}/api/project");

    axum::serve(listener, router()).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn project_get_handler(Query(payload): Query<ProjectPayload>) -> Response {
    project_handler_impl(payload).await
}

async fn project_post_handler(Json(payload): Json<ProjectPayload>) -> Response {
    project_handler_impl(payload).await
}

async fn project_handler_impl(payload: ProjectPayload) -> Response {
    log::debug!("project request: {payload:?}");
    let request = match project_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };

    match build_project_response(&request) {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(e) => {
            if e.status().is_server_error() {
                log::error!("project request failed: {}", e.message());
            }
            error_response(e.status(), &e.message())
        }
    }
}

async fn cities_handler(Query(query): Query<LanguageQuery>) -> Response {
    let language = Locale::from_preference(query.language.as_deref().unwrap_or_default());
    match build_city_views(&language) {
        Ok(views) => json_response(StatusCode::OK, views),
        Err(e) => {
            log::error!("reference data unavailable: {e}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())
        }
    }
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        "no-store".parse().expect("valid header"),
    );
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    with_cache_control((status, Json(body)))
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn project_request_from_json(json: &str) -> Result<ProjectRequest, String> {
    let payload = serde_json::from_str::<ProjectPayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    project_request_from_payload(payload)
}

fn project_request_from_payload(payload: ProjectPayload) -> Result<ProjectRequest, String> {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.target {
        cli.target = v;
    }
    if let Some(v) = payload.current {
        cli.current = v;
    }
    if let Some(v) = payload.monthly_contribution {
        cli.monthly_contribution = v;
    }
    if let Some(v) = payload.annual_bonus {
        cli.annual_bonus = v;
    }
    if let Some(v) = payload.annual_return {
        cli.annual_return = v;
    }
    if let Some(v) = payload.fire_ratio {
        cli.fire_ratio = v;
    }
    if let Some(v) = payload.inflation_rate {
        cli.inflation_rate = v;
    }
    if let Some(v) = payload.horizon_years {
        cli.horizon_years = v;
    }
    if let Some(v) = payload.projection_years {
        cli.projection_years = v;
    }
    if let Some(v) = payload.language {
        cli.language = Locale::from_preference(&v).to_string();
    }
    if let Some(v) = payload.city {
        cli.city = Some(v);
    }
    if let Some(v) = payload.household {
        cli.household = Some(v.into());
    }
    if let Some(v) = payload.pension_count {
        cli.pension_count = v;
    }

    build_request(cli)
}

fn default_cli_for_api() -> Cli {
    Cli {
        target: 420_000.0,
        current: 72_800.0,
        monthly_contribution: 2_240.0,
        annual_bonus: 11_200.0,
        annual_return: 7.0,
        fire_ratio: 3.6,
        inflation_rate: 3.0,
        horizon_years: DEFAULT_HORIZON_YEARS,
        projection_years: DEFAULT_PROJECTION_YEARS,
        language: Locale::DEFAULT_TAG.to_string(),
        city: None,
        household: None,
        pension_count: DEFAULT_CLOSEST_PENSIONS,
    }
}

fn build_project_response(request: &ProjectRequest) -> Result<ProjectResponse, RequestError> {
    let result = calculate_projection(&request.input, &request.config)
        .map_err(|e| RequestError::Invalid(e.to_string()))?;
    let language = &request.language;
    let annual_spending = request.input.annual_spending();

    let pensions = builtin_pensions()?;
    let closest = closest_pensions(annual_spending, pensions, request.pension_count)
        .into_iter()
        .map(|p| PensionView {
            label: p.pension_type.resolve(language).to_string(),
            annual_pension: p.annual_pension,
        })
        .collect();

    let income_level = match &request.income {
        Some(query) => {
            let registry = CityRegistry::builtin()?;
            let city = registry.get(&query.city)?;
            let classification = city.classify(query.household, annual_spending)?;
            Some(IncomeLevelView {
                city: classification.city,
                city_name: city.name.resolve(language).to_string(),
                household: classification.household,
                tier: classification.tier,
                level: classification.status.level.resolve(language).to_string(),
                description: classification
                    .status
                    .description
                    .resolve(language)
                    .to_string(),
            })
        }
        None => None,
    };

    Ok(ProjectResponse {
        language: language.clone(),
        months_to_target: result.months_to_target,
        duration: format_duration(
            result.months_to_target,
            language,
            request.config.horizon_years,
        ),
        annual_spending,
        monthly_spending: request.input.monthly_spending(),
        inflation_rate: request.config.inflation_rate,
        horizon_years: request.config.horizon_years,
        projection_years: request.config.projection_years,
        series: result.series,
        closest_pensions: closest,
        income_level,
    })
}

fn build_city_views(language: &Locale) -> Result<Vec<CityView>, ReferenceError> {
    let registry = CityRegistry::builtin()?;
    Ok(registry
        .cities()
        .map(|city| CityView {
            key: city.key.clone(),
            name: city.name.resolve(language).to_string(),
            households: city.households.keys().copied().collect(),
            notes: city
                .notes
                .iter()
                .map(|note| CityNoteView {
                    author: note.author.clone(),
                    date: note.date.clone(),
                    content: note.content.resolve(language).to_string(),
                })
                .collect(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn sample_cli() -> Cli {
        default_cli_for_api()
    }

    #[test]
    fn build_request_converts_percentages() {
        let request = build_request(sample_cli()).expect("valid inputs");
        assert_approx(request.input.annual_return_rate, 0.07);
        assert_approx(request.input.fire_spend_ratio, 0.036);
        assert_approx(request.config.inflation_rate, 0.03);
        assert_eq!(request.config.horizon_years, 50);
        assert_eq!(request.language, Locale::cn());
        assert!(request.income.is_none());
    }

    #[test]
    fn build_request_rejects_return_at_minus_hundred() {
        let mut cli = sample_cli();
        cli.annual_return = -100.0;
        let err = build_request(cli).expect_err("must reject");
        assert!(err.contains("--annual-return"));
    }

    #[test]
    fn build_request_rejects_negative_amounts() {
        let mut cli = sample_cli();
        cli.monthly_contribution = -5.0;
        let err = build_request(cli).expect_err("must reject");
        assert!(err.contains("--monthly-contribution"));
    }

    #[test]
    fn build_request_requires_city_and_household_together() {
        let mut cli = sample_cli();
        cli.city = Some("vientiane".to_string());
        let err = build_request(cli).expect_err("must reject");
        assert!(err.contains("--household"));
    }

    #[test]
    fn build_request_rejects_zero_horizon() {
        let mut cli = sample_cli();
        cli.horizon_years = 0;
        assert!(build_request(cli).is_err());
    }

    #[test]
    fn build_request_rejects_oversized_year_counts() {
        let mut cli = sample_cli();
        cli.horizon_years = MAX_HORIZON_YEARS + 1;
        let err = build_request(cli).expect_err("must reject");
        assert!(err.contains("--horizon-years"));

        let err = project_request_from_json(r#"{"projectionYears": 4000000000}"#)
            .expect_err("must reject");
        assert!(err.contains("--projection-years"));
        let err = project_request_from_json(r#"{"horizonYears": 4000000000}"#)
            .expect_err("must reject");
        assert!(err.contains("--horizon-years"));

        let request = project_request_from_json(r#"{"projectionYears": 100, "horizonYears": 100}"#)
            .expect("upper bound is accepted");
        let response = build_project_response(&request).expect("valid");
        assert_eq!(response.series.len(), MAX_PROJECTION_YEARS as usize + 1);
    }

    #[test]
    fn cli_defaults_match_api_defaults() {
        let parsed = Cli::try_parse_from(["eazy-fire"]).expect("defaults parse");
        let defaults = default_cli_for_api();
        assert_approx(parsed.target, defaults.target);
        assert_approx(parsed.annual_return, defaults.annual_return);
        assert_approx(parsed.fire_ratio, defaults.fire_ratio);
        assert_eq!(parsed.language, defaults.language);
        assert_eq!(parsed.pension_count, defaults.pension_count);

        let parsed = Cli::try_parse_from([
            "eazy-fire",
            "--annual-return",
            "-2.5",
            "--household",
            "two-children",
            "--city",
            "vientiane",
        ])
        .expect("flags parse");
        assert_approx(parsed.annual_return, -2.5);
        assert_eq!(parsed.household, Some(CliHousehold::TwoChildren));
    }

    #[test]
    fn request_from_json_parses_web_keys() {
        let request = project_request_from_json(
            r#"{
                "target": 10000,
                "current": 0,
                "monthlyContribution": 500,
                "annualBonus": 0,
                "annualReturn": 0,
                "fireRatio": 4,
                "inflationRate": 2,
                "horizonYears": 30,
                "language": "en",
                "city": "chiang_mai",
                "household": "twoChildren",
                "pensionCount": 5
            }"#,
        )
        .expect("valid payload");

        assert_approx(request.input.target_net_worth, 10_000.0);
        assert_approx(request.input.monthly_contribution, 500.0);
        assert_approx(request.input.fire_spend_ratio, 0.04);
        assert_approx(request.config.inflation_rate, 0.02);
        assert_eq!(request.config.horizon_years, 30);
        assert_eq!(request.language, Locale::en());
        assert_eq!(request.pension_count, 5);
        let income = request.income.expect("income query");
        assert_eq!(income.city, "chiang_mai");
        assert_eq!(income.household, HouseholdType::TwoChildren);
    }

    #[test]
    fn request_from_json_rejects_non_numeric_amounts() {
        let err = project_request_from_json(r#"{"target": "lots"}"#).expect_err("must reject");
        assert!(err.contains("Invalid API JSON payload"));
    }

    #[test]
    fn unusable_language_falls_back_to_default() {
        let request = project_request_from_json(r#"{"language": ""}"#).expect("valid");
        assert_eq!(request.language, Locale::cn());
    }

    #[test]
    fn project_response_for_pure_contribution() {
        let request = project_request_from_json(
            r#"{"target": 10000, "current": 0, "monthlyContribution": 500,
                "annualBonus": 0, "annualReturn": 0, "language": "EN"}"#,
        )
        .expect("valid payload");
        let response = build_project_response(&request).expect("response");
        assert_eq!(response.months_to_target, Some(20));
        assert_eq!(response.duration, "1 year 8 months");
        assert_eq!(response.series.len(), 41);
        assert_approx(response.series[0].nominal_assets, 10_000.0);
        assert_eq!(response.closest_pensions.len(), 3);
        assert!(response.income_level.is_none());
    }

    #[test]
    fn unreached_target_has_empty_series() {
        let request = project_request_from_json(
            r#"{"target": 100000000, "current": 0, "monthlyContribution": 10,
                "annualBonus": 0, "annualReturn": 0}"#,
        )
        .expect("valid payload");
        let response = build_project_response(&request).expect("response");
        assert_eq!(response.months_to_target, None);
        assert_eq!(response.duration, "超过 50 年");
        assert!(response.series.is_empty());
    }

    #[test]
    fn income_level_uses_requested_language() {
        let request = project_request_from_json(
            r#"{"language": "EN", "city": "vientiane", "household": "single"}"#,
        )
        .expect("valid payload");
        let response = build_project_response(&request).expect("response");
        let income = response.income_level.expect("income level");
        assert_eq!(income.tier, TierLabel::Percentile(90));
        assert_eq!(income.level, "Upper Middle");
        assert_eq!(income.city_name, "Laos · Vientiane");
        assert_eq!(
            response
                .closest_pensions
                .iter()
                .map(|p| p.label.as_str())
                .collect::<Vec<_>>(),
            vec![
                "Spain Average Pension",
                "Canada Average Pension",
                "France Average Pension"
            ]
        );
    }

    #[test]
    fn unknown_city_is_a_client_error() {
        let request =
            project_request_from_json(r#"{"city": "atlantis", "household": "dink"}"#)
                .expect("valid payload");
        let err = build_project_response(&request).expect_err("must fail");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(err.message().contains("atlantis"));
    }

    #[test]
    fn project_response_serialization_contains_expected_fields() {
        let request = build_request(sample_cli()).expect("valid inputs");
        let response = build_project_response(&request).expect("response");
        let value = serde_json::to_value(&response).expect("serializes");

        for key in [
            "language",
            "monthsToTarget",
            "duration",
            "annualSpending",
            "monthlySpending",
            "inflationRate",
            "horizonYears",
            "projectionYears",
            "series",
            "closestPensions",
            "incomeLevel",
        ] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
        assert_eq!(value["language"], "CN");
        assert!(value["incomeLevel"].is_null());
        let first = &value["series"][0];
        for key in [
            "yearOffset",
            "nominalAssets",
            "realAssets",
            "netWorthAfterSpending",
        ] {
            assert!(first.get(key).is_some(), "missing series field {key}");
        }
        assert_approx(value["annualSpending"].as_f64().expect("number"), 15_120.0);
    }

    #[test]
    fn city_views_are_localized() {
        let views = build_city_views(&Locale::en()).expect("builtin data");
        assert_eq!(views.len(), 2);
        assert_eq!(views[0].key, "chiang_mai");
        assert_eq!(views[0].name, "Thailand · Chiang Mai");
        assert_eq!(
            views[0].households,
            vec![
                HouseholdType::Single,
                HouseholdType::Dink,
                HouseholdType::TwoChildren
            ]
        );
        assert!(views[1].notes[0].content.starts_with("Vientiane"));
    }
}
