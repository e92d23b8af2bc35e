use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::request::Parts,
    Json,
};
use serde::{de::DeserializeOwned, Deserialize};
use validator::Validate;

use crate::error::ApiError;

/// Positive integer id taken from the `:id` path segment.
///
/// Anything else is rejected with `400` before storage is touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityId(pub u32);

#[async_trait]
impl<S> FromRequestParts<S> for EntityId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state).await?;
        parse_id(&raw).map(EntityId)
    }
}

fn parse_id(raw: &str) -> Result<u32, ApiError> {
    raw.parse::<u32>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| ApiError::Validation(format!("Invalid id: {}", raw)))
}

/// JSON body that is deserialized and then validated.
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(ValidatedJson(value))
    }
}

/// Optional `?clientId=` filter on list endpoints.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientFilter {
    pub client_id: Option<String>,
}

impl ClientFilter {
    /// Parsed client id; an empty value means no filter.
    pub fn client_id(&self) -> Result<Option<u32>, ApiError> {
        match self.client_id.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => parse_id(raw).map(Some),
        }
    }
}

/// Extractor wrapper for [`ClientFilter`] producing the parsed id.
pub struct ClientIdFilter(pub Option<u32>);

#[async_trait]
impl<S> FromRequestParts<S> for ClientIdFilter
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(filter) = Query::<ClientFilter>::from_request_parts(parts, state).await?;
        filter.client_id().map(ClientIdFilter)
    }
}

/// Keeps only records that belong to `client_id`, when a filter is given.
pub fn filter_by_client<T>(records: Vec<T>, client_id: Option<u32>, owner: impl Fn(&T) -> u32) -> Vec<T> {
    match client_id {
        Some(id) => records.into_iter().filter(|record| owner(record) == id).collect(),
        None => records,
    }
}
