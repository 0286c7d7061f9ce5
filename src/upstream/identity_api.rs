// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity GraphQL API: vehicles owned by an address.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

use super::{send, VehicleDirectory};
use crate::error::ServiceError;
use crate::models::{AftermarketDevice, Vehicle};

const SERVICE: &str = "identity API";

/// Only the first page is fetched.
pub const VEHICLE_PAGE_SIZE: u32 = 10;

const VEHICLES_BY_OWNER_QUERY: &str = r#"
query VehiclesByOwner($owner: Address!, $first: Int!) {
  vehicles(first: $first, filterBy: { owner: $owner }) {
    nodes {
      tokenId
      earnings {
        totalTokens
      }
      definition {
        make
        model
        year
      }
      aftermarketDevice {
        address
        serial
        manufacturer {
          name
        }
      }
    }
  }
}
"#;

#[derive(Debug, Serialize)]
struct GraphQlRequest<'a> {
    query: &'a str,
    variables: Value,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<VehiclesData>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct VehiclesData {
    vehicles: VehicleConnection,
}

#[derive(Debug, Deserialize)]
struct VehicleConnection {
    nodes: Vec<VehicleNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VehicleNode {
    token_id: u64,
    earnings: Option<Earnings>,
    definition: Option<Definition>,
    aftermarket_device: Option<DeviceNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Earnings {
    total_tokens: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct Definition {
    make: Option<String>,
    model: Option<String>,
    year: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct DeviceNode {
    address: Option<String>,
    serial: Option<String>,
    manufacturer: Option<Manufacturer>,
}

#[derive(Debug, Deserialize)]
struct Manufacturer {
    name: Option<String>,
}

impl From<VehicleNode> for Vehicle {
    fn from(node: VehicleNode) -> Self {
        let definition = node.definition;
        Vehicle {
            id: node.token_id,
            make: definition.as_ref().and_then(|d| d.make.clone()),
            model: definition.as_ref().and_then(|d| d.model.clone()),
            year: definition.as_ref().and_then(|d| d.year),
            earnings_total: node
                .earnings
                .and_then(|e| e.total_tokens)
                .and_then(|total| match total {
                    Value::String(s) => Some(s),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                }),
            aftermarket_device: node.aftermarket_device.map(|device| AftermarketDevice {
                address: device.address,
                serial: device.serial,
                manufacturer: device.manufacturer.and_then(|m| m.name),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IdentityApiClient {
    url: Url,
    http: Client,
}

impl IdentityApiClient {
    pub fn new(url: Url, http: Client) -> Self {
        Self { url, http }
    }
}

#[async_trait]
impl VehicleDirectory for IdentityApiClient {
    async fn vehicles_owned_by(&self, owner: &str) -> Result<Vec<Vehicle>, ServiceError> {
        let request = GraphQlRequest {
            query: VEHICLES_BY_OWNER_QUERY,
            variables: json!({ "owner": owner, "first": VEHICLE_PAGE_SIZE }),
        };

        let response = send(SERVICE, self.http.post(self.url.clone()).json(&request)).await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::malformed(SERVICE, format!("HTTP {status}")));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ServiceError::unavailable(SERVICE, e))?;
        let payload: GraphQlResponse =
            serde_json::from_slice(&body).map_err(|e| ServiceError::malformed(SERVICE, e))?;

        if let Some(first) = payload.errors.first() {
            return Err(ServiceError::malformed(
                SERVICE,
                format!("query failed: {}", first.message),
            ));
        }

        let data = payload
            .data
            .ok_or_else(|| ServiceError::malformed(SERVICE, "response has no data"))?;

        let vehicles: Vec<Vehicle> = data.vehicles.nodes.into_iter().map(Vehicle::from).collect();
        debug!(owner = %owner, count = vehicles.len(), "Resolved vehicles");
        Ok(vehicles)
    }
}
