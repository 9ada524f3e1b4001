//! [`Command`] for authorizing a [`Session`].

use derive_more::{Display, Error, From};
use jsonwebtoken::{Algorithm, Validation};
use tracerr::Traced;

use crate::{
    domain::user::{session, Session},
    Service,
};

use super::Command;

/// [`Command`] for authorizing a [`Session`] by its [`session::Token`].
///
/// [`Session`]s are issued by an external identity provider, so only the
/// token signature and expiration are verified.
#[derive(Clone, Debug, From)]
pub struct AuthorizeUserSession {
    /// [`Session`] token to authorize.
    pub token: session::Token,
}

impl<Db> Command<AuthorizeUserSession> for Service<Db> {
    type Ok = Session;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: AuthorizeUserSession,
    ) -> Result<Self::Ok, Self::Err> {
        let AuthorizeUserSession { token } = cmd;

        let session = jsonwebtoken::decode::<Session>(
            token.as_ref(),
            &self.config().jwt_decoding_key,
            &Validation::new(Algorithm::HS256),
        )
        .map_err(tracerr::from_and_wrap!(=> ExecutionError))?
        .claims;

        Ok(session)
    }
}

/// Error of [`AuthorizeUserSession`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`jsonwebtoken`] decoding error.
    #[display("Failed to decode a JSON Web Token: {_0}")]
    JsonWebTokenDecodeError(jsonwebtoken::errors::Error),
}

#[cfg(all(test, feature = "memory"))]
mod spec {
    use common::DateTime;
    use jsonwebtoken::{EncodingKey, Header};

    use crate::{
        domain::user::{self, Role, Session},
        infra::Memory,
        Command as _, Config, Service,
    };

    use super::AuthorizeUserSession;

    fn service(secret: &[u8]) -> Service<Memory> {
        let config = Config {
            jwt_decoding_key: jsonwebtoken::DecodingKey::from_secret(secret),
        };
        Service::new(config, Memory::new())
    }

    fn token(secret: &[u8], session: &Session) -> String {
        jsonwebtoken::encode(
            &Header::default(),
            session,
            &EncodingKey::from_secret(secret),
        )
        .unwrap()
    }

    fn session(expires_in: i64) -> Session {
        let now = DateTime::now().unix_timestamp();
        Session {
            user_id: user::Id::new(),
            role: Role::Hr,
            expires_at: DateTime::from_unix_timestamp(now + expires_in)
                .unwrap()
                .coerce(),
        }
    }

    #[tokio::test]
    async fn decodes_valid_token() {
        let expected = session(3600);
        let token = token(b"secret", &expected);

        let session = service(b"secret")
            .execute(AuthorizeUserSession::from(
                user::session::Token::from(token),
            ))
            .await
            .unwrap();

        assert_eq!(session.user_id, expected.user_id);
        assert_eq!(session.role, Role::Hr);
        assert_eq!(session.expires_at, expected.expires_at);
    }

    #[tokio::test]
    async fn rejects_foreign_signature() {
        let token = token(b"other", &session(3600));

        let res = service(b"secret")
            .execute(AuthorizeUserSession::from(
                user::session::Token::from(token),
            ))
            .await;

        assert!(res.is_err());
    }

    #[tokio::test]
    async fn rejects_expired_token() {
        // Outlives the default validation leeway.
        let token = token(b"secret", &session(-600));

        let res = service(b"secret")
            .execute(AuthorizeUserSession::from(
                user::session::Token::from(token),
            ))
            .await;

        assert!(res.is_err());
    }
}
