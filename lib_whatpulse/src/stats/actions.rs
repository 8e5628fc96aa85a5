//! # Client Actions
//!
//! One-shot POSTs against the local WhatPulse client. An action is invoked
//! at most once per request: no retry, no cached state. Failures are logged
//! and reported as `false`.

use std::fmt;
use std::num::NonZeroU64;
use std::str::FromStr;
use std::time::Duration;

use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::error::WhatPulseError;
use crate::retrieve::ky_http::ApiClient;

/// A validated, strictly positive profile id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u64")]
pub struct ProfileId(NonZeroU64);

impl ProfileId {
    /// The raw id.
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl TryFrom<i64> for ProfileId {
    type Error = WhatPulseError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u64::try_from(value)
            .ok()
            .and_then(NonZeroU64::new)
            .map(ProfileId)
            .ok_or_else(|| WhatPulseError::InvalidProfileId(value.to_string()))
    }
}

impl From<ProfileId> for u64 {
    fn from(id: ProfileId) -> Self {
        id.get()
    }
}

impl FromStr for ProfileId {
    type Err = WhatPulseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .ok()
            .and_then(NonZeroU64::new)
            .map(ProfileId)
            .ok_or_else(|| WhatPulseError::InvalidProfileId(s.to_string()))
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Serialize)]
struct ActivateProfileBody {
    profile_id: u64,
}

/// Something the local client can be asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Upload unpulsed counters now.
    Pulse,
    /// Bring the client window to the front.
    OpenWindow,
    /// Switch to another profile.
    ActivateProfile(ProfileId),
}

impl Action {
    /// Stable identifier, used in entity ids and routes.
    pub fn id(&self) -> &'static str {
        match self {
            Action::Pulse => "pulse",
            Action::OpenWindow => "open_window",
            Action::ActivateProfile(_) => "activate_profile",
        }
    }

    /// Path under the client base URL.
    pub fn endpoint(&self) -> &'static str {
        match self {
            Action::Pulse => "/v1/pulse",
            Action::OpenWindow => "/v1/open-window",
            Action::ActivateProfile(_) => "/v1/profiles/activate",
        }
    }
}

impl FromStr for Action {
    type Err = WhatPulseError;

    /// Parses the parameterless actions. `activate_profile` needs a profile
    /// id and must be built as `Action::ActivateProfile` directly.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pulse" => Ok(Action::Pulse),
            "open_window" => Ok(Action::OpenWindow),
            _ => Err(WhatPulseError::UnknownAction(s.to_string())),
        }
    }
}

/// Sends actions to one local client.
#[derive(Debug, Clone)]
pub struct ActionInvoker {
    api: ApiClient,
}

impl ActionInvoker {
    /// Builds an invoker for the client at `client_api_url`.
    ///
    /// # Errors
    /// `WhatPulseError::InvalidUrl` if the URL does not parse.
    pub fn new(client_api_url: &str, timeout: Duration) -> Result<Self, WhatPulseError> {
        let api = ApiClient::new(client_api_url, timeout).map_err(|e| WhatPulseError::InvalidUrl {
            url: client_api_url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { api })
    }

    /// POSTs the action. `true` only on HTTP 200.
    pub async fn invoke(&self, action: &Action) -> bool {
        let result = match action {
            Action::ActivateProfile(profile_id) => {
                let body = ActivateProfileBody {
                    profile_id: profile_id.get(),
                };
                self.api
                    .request_text(Method::POST, action.endpoint(), &[], Some(&body))
                    .await
            }
            _ => {
                self.api
                    .request_text::<()>(Method::POST, action.endpoint(), &[], None)
                    .await
            }
        };

        match result {
            Ok(response) if response.is_ok() => {
                info!(action = action.id(), "Successfully performed action");
                true
            }
            Ok(response) => {
                error!(
                    action = action.id(),
                    status = response.status,
                    body = response.error_body.as_deref().or(response.data.as_deref()).unwrap_or_default(),
                    "WhatPulse client rejected action"
                );
                false
            }
            Err(e) => {
                error!(action = action.id(), error = %e, "Error performing action");
                false
            }
        }
    }

    /// Invokes a parameterless action by id. Unknown ids are logged and
    /// reported as `false`.
    pub async fn invoke_id(&self, action_id: &str) -> bool {
        match action_id.parse::<Action>() {
            Ok(action) => self.invoke(&action).await,
            Err(e) => {
                error!(action = action_id, error = %e, "Cannot perform action");
                false
            }
        }
    }
}
