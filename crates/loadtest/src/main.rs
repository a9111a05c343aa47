use goose::prelude::*;
use std::env;
use std::time::Duration;

fn source_url() -> String {
    env::var("SOURCE_URL").unwrap_or_else(|_| "http://localhost:3000/".to_string())
}

/// The broker redirects to Azure AD; following it would load-test Microsoft.
async fn setup_client(user: &mut GooseUser) -> TransactionResult {
    let builder = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .cookie_store(true)
        .timeout(Duration::from_secs(30));
    user.set_client_builder(builder).await?;
    Ok(())
}

async fn health_check(user: &mut GooseUser) -> TransactionResult {
    let _goose_metrics = user.get("/healthz").await?;
    Ok(())
}

async fn start_microsoft_login(user: &mut GooseUser) -> TransactionResult {
    let path = format!("/oauth/microsoft?source={}", urlencoding::encode(&source_url()));
    let goose_request = GooseRequest::builder()
        .path(path.as_str())
        .expect_status_code(303)
        .build();
    let _goose_metrics = user.request(goose_request).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), GooseError> {
    println!("Source URL for login calls: {}", source_url());

    GooseAttack::initialize()?
        .register_scenario(
            scenario!("HealthCheck").register_transaction(transaction!(health_check)),
        )
        .register_scenario(
            scenario!("MicrosoftLogin")
                .register_transaction(transaction!(setup_client).set_on_start())
                .register_transaction(transaction!(start_microsoft_login)),
        )
        .execute()
        .await?;

    Ok(())
}
