use serde::Deserialize;
use std::collections::HashMap;

use crate::auth::ClientHandle;
use crate::error::{GatewayError, Result};

/// Profile fields requested for `people/me`.
pub const PERSON_FIELDS: &str = "names,emailAddresses,photos,phoneNumbers,organizations,addresses,birthdays,genders,imClients,externalIds,skills,biographies,urls,metadata";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonName {
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmailAddress {
    pub value: Option<String>,
}

/// Subset of the People API `Person` resource.
///
/// Fields this gateway doesn't use are kept raw in `other`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub resource_name: Option<String>,
    #[serde(default)]
    pub names: Vec<PersonName>,
    #[serde(default)]
    pub email_addresses: Vec<EmailAddress>,
    #[serde(flatten)]
    pub other: HashMap<String, serde_json::Value>,
}

impl Person {
    pub fn display_name(&self) -> Option<&str> {
        self.names.iter().find_map(|n| n.display_name.as_deref())
    }

    pub fn primary_email(&self) -> Option<&str> {
        self.email_addresses.iter().find_map(|e| e.value.as_deref())
    }

    /// Name used to greet the user: display name, else email, else "there".
    pub fn greeting_name(&self) -> &str {
        self.display_name()
            .or_else(|| self.primary_email())
            .unwrap_or("there")
    }
}

#[derive(Debug, Clone)]
pub struct PeopleClient {
    api_base: String,
}

impl PeopleClient {
    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    /// Fetch the profile of the user who owns the token.
    pub async fn get_me(&self, handle: &ClientHandle) -> Result<Person> {
        let access_token = handle.bearer()?;

        let response = handle
            .http_client()
            .get(format!("{}/v1/people/me", self.api_base))
            .query(&[("personFields", PERSON_FIELDS)])
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| GatewayError::RemoteApiError(format!("People API request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = format!("People API error: {} - {}", status, body);
            return Err(if status == reqwest::StatusCode::UNAUTHORIZED {
                GatewayError::Unauthorized(message)
            } else {
                GatewayError::RemoteApiError(message)
            });
        }

        response.json::<Person>().await.map_err(|e| {
            GatewayError::RemoteApiError(format!("failed to parse People API response: {}", e))
        })
    }
}
