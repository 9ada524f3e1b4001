//! HTTP [`Backend`] implementation.

use common::{
    operations::{By, Perform, Select, Update},
    TimeZone,
};
use derive_more::Debug;
use serde::{de::DeserializeOwned, Serialize};
use service::{
    domain::{
        attendance::{self, breaks, Action, DayAssignment, ShiftReport},
        user::session,
    },
    read::attendance::{list, History, Snapshot},
};
use tracerr::Traced;

use crate::Config;

use super::{Backend, Error, ErrorBody, Rejection};

/// Name of the HTTP header carrying the IANA time zone of the caller.
const TIME_ZONE_HEADER: &str = "x-timezone";

/// Path of the attendance resource.
const ATTENDANCE: &str = "/attendance";

/// Path of the attendance history resource.
const HISTORY: &str = "/attendance/history";

/// [`Backend`] talking to the attendance server over HTTP.
#[derive(Clone, Debug)]
pub struct Http {
    /// Underlying HTTP client.
    client: reqwest::Client,

    /// Base URL of the server, without a trailing slash.
    base_url: String,

    /// Bearer token authenticating the requests.
    #[debug(skip)]
    token: session::Token,
}

impl Http {
    /// Creates a new [`Http`] backend authenticating with the provided
    /// `token`.
    ///
    /// # Errors
    ///
    /// If the underlying HTTP client cannot be initialized.
    pub fn new(
        config: &Config,
        token: session::Token,
    ) -> Result<Self, Traced<Error>> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(tracerr::from_and_wrap!(=> Error))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            token,
        })
    }

    /// Returns the full URL of the provided `path`.
    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Sends the provided request and decodes its response.
    async fn send<T: DeserializeOwned>(
        &self,
        req: reqwest::RequestBuilder,
        time_zone: &TimeZone,
    ) -> Result<T, Traced<Error>> {
        let resp = req
            .bearer_auth(self.token.as_ref())
            .header(TIME_ZONE_HEADER, time_zone.name())
            .send()
            .await
            .map_err(tracerr::from_and_wrap!(=> Error))?;

        let status = resp.status();
        if status.is_success() {
            return resp
                .json()
                .await
                .map_err(tracerr::from_and_wrap!(=> Error));
        }

        // Proxies may answer with a non-JSON body.
        let rejection = match resp.json::<ErrorBody>().await {
            Ok(ErrorBody { error }) => {
                Rejection::new(status.as_u16(), error.code, error.message)
            }
            Err(_) => Rejection::new(
                status.as_u16(),
                "UNKNOWN",
                status.canonical_reason().unwrap_or_default(),
            ),
        };
        Err(tracerr::new!(Error::Rejected(rejection)))
    }
}

impl Backend<Select<By<Snapshot, TimeZone>>> for Http {
    type Ok = Snapshot;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Snapshot, TimeZone>>,
    ) -> Result<Self::Ok, Self::Err> {
        let time_zone = by.into_inner();
        let req = self
            .client
            .get(self.url(ATTENDANCE))
            .query(&[("timezone", time_zone.name())]);
        self.send(req, &time_zone)
            .await
            .map_err(tracerr::wrap!())
    }
}

impl Backend<Select<By<History, list::Selector>>> for Http {
    type Ok = History;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Select(by): Select<By<History, list::Selector>>,
    ) -> Result<Self::Ok, Self::Err> {
        let list::Selector {
            filter: list::Filter { user_id, from, to },
            limit,
        } = by.into_inner();

        let mut params = vec![("limit", limit.to_string())];
        if let Some(id) = user_id {
            params.push(("userId", id.to_string()));
        }
        if let Some(from) = from {
            params.push(("startDate", from.to_string()));
        }
        if let Some(to) = to {
            params.push(("endDate", to.to_string()));
        }

        let req = self.client.get(self.url(HISTORY)).query(&params);
        self.send(req, &TimeZone::utc())
            .await
            .map_err(tracerr::wrap!())
    }
}

impl Backend<Perform<By<Snapshot, (Action, TimeZone)>>> for Http {
    type Ok = Snapshot;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Perform(by): Perform<By<Snapshot, (Action, TimeZone)>>,
    ) -> Result<Self::Ok, Self::Err> {
        /// Request body of an [`Action`].
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Body {
            action: &'static str,
            timezone: &'static str,
            #[serde(skip_serializing_if = "Option::is_none")]
            break_type: Option<breaks::Kind>,
            #[serde(skip_serializing_if = "Option::is_none")]
            use_next_day: Option<bool>,
        }

        let (action, time_zone) = by.into_inner();
        let body = Body {
            action: action.name(),
            timezone: time_zone.name(),
            break_type: match action {
                Action::StartBreak(kind) => Some(kind),
                Action::ClockIn | Action::EndBreak | Action::ClockOut(_) => {
                    None
                }
            },
            use_next_day: match action {
                Action::ClockOut(day) => Some(day == DayAssignment::NextDay),
                Action::ClockIn | Action::StartBreak(_) | Action::EndBreak => {
                    None
                }
            },
        };

        let req = self.client.post(self.url(ATTENDANCE)).json(&body);
        self.send(req, &time_zone)
            .await
            .map_err(tracerr::wrap!())
    }
}

impl Backend<Update<By<Snapshot, (attendance::Id, ShiftReport, TimeZone)>>>
    for Http
{
    type Ok = Snapshot;
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Update(by): Update<
            By<Snapshot, (attendance::Id, ShiftReport, TimeZone)>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        /// Request body of a [`ShiftReport`] submission.
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Body<'a> {
            attendance_id: attendance::Id,
            shift_report: &'a ShiftReport,
            timezone: &'static str,
        }

        let (attendance_id, report, time_zone) = by.into_inner();
        let req = self.client.patch(self.url(ATTENDANCE)).json(&Body {
            attendance_id,
            shift_report: &report,
            timezone: time_zone.name(),
        });
        self.send(req, &time_zone)
            .await
            .map_err(tracerr::wrap!())
    }
}
