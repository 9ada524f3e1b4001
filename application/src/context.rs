//! [`Context`]-related definitions.

use axum::{
    async_trait,
    extract::{FromRequestParts, Query},
    RequestPartsExt as _,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use common::TimeZone;
use serde::Deserialize;
use service::{
    command::{self, Command as _},
    domain::user::{session, Session},
};

use crate::{define_error, AsError, Error, Service};

/// Name of the HTTP header carrying the IANA time zone of the caller.
pub const TIME_ZONE_HEADER: &str = "x-timezone";

/// Context of an authorized HTTP request.
#[derive(Debug)]
pub struct Context {
    /// [`Service`] instance.
    service: Service,

    /// [`Session`] of the caller.
    session: Session,

    /// Time zone name from the [`TIME_ZONE_HEADER`], if any.
    header_time_zone: Option<String>,

    /// Time zone name from the `timezone` query parameter, if any.
    query_time_zone: Option<String>,
}

impl Context {
    /// Returns [`Service`] instance of this [`Context`].
    #[must_use]
    pub fn service(&self) -> &Service {
        &self.service
    }

    /// Returns the [`Session`] of the caller.
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Resolves the [`TimeZone`] of the caller.
    ///
    /// The first present of the request body field, the
    /// [`TIME_ZONE_HEADER`] and the `timezone` query parameter wins, falling
    /// back to UTC.
    ///
    /// # Errors
    ///
    /// If the winning name is not a known IANA time zone.
    pub fn time_zone(&self, body: Option<&str>) -> Result<TimeZone, Error> {
        let Some(name) = body
            .or(self.header_time_zone.as_deref())
            .or(self.query_time_zone.as_deref())
        else {
            return Ok(TimeZone::utc());
        };
        name.parse()
            .map_err(|_| TimeZoneError::Unknown.into())
    }

    /// Performs the [`Session`] authentication.
    ///
    /// # Errors
    ///
    /// Errors if the provided authentication token is missing or invalid.
    async fn authenticate(
        service: &Service,
        parts: &mut http::request::Parts,
    ) -> Result<Session, Error> {
        let res = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await;
        match res {
            Ok(TypedHeader(Authorization(bearer))) => service
                .execute(command::AuthorizeUserSession {
                    token: session::Token::from(bearer.token().to_owned()),
                })
                .await
                .map_err(AsError::into_error),
            Err(e) => {
                if e.is_missing() {
                    Err(AuthError::AuthorizationRequired.into())
                } else {
                    Err(e.into_error())
                }
            }
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Context
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut http::request::Parts,
        _: &S,
    ) -> Result<Self, Self::Rejection> {
        /// Query parameters recognized by every endpoint.
        #[derive(Deserialize)]
        struct TimeZoneQuery {
            timezone: Option<String>,
        }

        let service = parts
            .extensions
            .get::<Service>()
            .cloned()
            .ok_or_else(|| Error::internal(&"missing `Service` extension"))?;

        let session = Self::authenticate(&service, parts).await?;

        let header_time_zone = parts
            .headers
            .get(TIME_ZONE_HEADER)
            .map(|h| {
                h.to_str()
                    .map(str::to_owned)
                    .map_err(|_| Error::from(TimeZoneError::Unknown))
            })
            .transpose()?;
        let query_time_zone = Query::<TimeZoneQuery>::try_from_uri(&parts.uri)
            .map(|Query(q)| q.timezone)
            .unwrap_or_default();

        Ok(Self {
            service,
            session,
            header_time_zone,
            query_time_zone,
        })
    }
}

impl AsError for command::authorize_user_session::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::JsonWebTokenDecodeError(_) => {
                Some(AuthError::AuthorizationRequired.into())
            }
        }
    }
}

define_error! {
    enum AuthError {
        #[code = "AUTHORIZATION_REQUIRED"]
        #[status = UNAUTHORIZED]
        #[message = "Authorization required"]
        AuthorizationRequired,
    }
}

define_error! {
    enum TimeZoneError {
        #[code = "VALIDATION_ERROR"]
        #[status = BAD_REQUEST]
        #[message = "Unknown IANA time zone"]
        Unknown,
    }
}
