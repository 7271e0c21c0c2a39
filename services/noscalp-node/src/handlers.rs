use axum::{
    extract::{Form, State},
    http::StatusCode,
    response::Json,
};
use noscalp_domain::StateAndRef;
use noscalp_flow::DistributionRequest;
use noscalp_identity::{IdentityResolver, LegalName};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info};

use crate::state::AppState;

/// Organisations that run network infrastructure rather than distribute tickets.
const SERVICE_ORGANISATIONS: [&str; 2] = ["Notary", "Network Map Service"];

pub async fn whoami(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({ "me": state.node.identity().name.to_string() }))
}

/// Distributors this node can propose to.
pub async fn peers(State(state): State<Arc<AppState>>) -> Json<Value> {
    let directory = state.network.directory();
    let me = state.node.identity();
    let notaries = directory.notary_identities();

    let peers: Vec<String> = directory
        .all_parties()
        .into_iter()
        .filter(|party| party != me && !notaries.contains(party))
        .filter(|party| !SERVICE_ORGANISATIONS.contains(&party.name.organisation()))
        .map(|party| party.name.to_string())
        .collect();

    Json(json!({ "peers": peers }))
}

pub async fn distributions(State(state): State<Arc<AppState>>) -> Json<Vec<StateAndRef>> {
    Json(state.node.vault().states().await)
}

#[derive(Debug, Deserialize)]
pub struct CreateDistributionForm {
    #[serde(rename = "eventName")]
    pub event_name: Option<String>,
    #[serde(rename = "ticketQuantity")]
    pub ticket_quantity: Option<String>,
    #[serde(rename = "distributorName")]
    pub distributor_name: Option<String>,
}

fn bad_request(message: impl Into<String>) -> (StatusCode, String) {
    (StatusCode::BAD_REQUEST, message.into())
}

/// Proposes a distribution from this node to `distributorName` and waits for
/// it to be finalized.
pub async fn create_distribution(
    State(state): State<Arc<AppState>>,
    Form(form): Form<CreateDistributionForm>,
) -> (StatusCode, String) {
    let Some(distributor_name) = form.distributor_name else {
        return bad_request("Query parameter 'distributorName' must not be null.\n");
    };
    let ticket_quantity = match form.ticket_quantity.as_deref().map(str::trim) {
        Some(raw) => match raw.parse::<i64>() {
            Ok(quantity) if quantity > 0 => quantity,
            _ => return bad_request("Query parameter 'ticketQuantity' must be non-negative.\n"),
        },
        None => return bad_request("Query parameter 'ticketQuantity' must be non-negative.\n"),
    };
    let event_name = form.event_name.unwrap_or_default();
    if event_name.trim().is_empty() {
        return bad_request("Query parameter 'eventName' must not be blank.\n");
    }

    let not_found = || bad_request(format!("Distributor named {} cannot be found.\n", distributor_name));
    let Ok(counterparty) = LegalName::parse(&distributor_name) else {
        return not_found();
    };
    if state
        .network
        .directory()
        .well_known_party(&counterparty)
        .is_none()
    {
        return not_found();
    }

    let request = DistributionRequest::new(ticket_quantity, event_name, counterparty);
    match state.node.run_distribution(request).await {
        Ok(ftx) => {
            info!(tx_id = %ftx.id(), "Distribution committed via command surface");
            (
                StatusCode::CREATED,
                format!("Distribution id {} committed to ledger.\n", ftx.id()),
            )
        }
        Err(e) => {
            error!(error = %e, "Distribution request failed");
            bad_request(e.to_string())
        }
    }
}
