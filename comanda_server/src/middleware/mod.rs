mod acl;
mod credentials;

pub use acl::{AclMiddlewareFactory, AclMiddlewareService};
pub use credentials::{
    collect_credentials,
    CredentialsMiddlewareFactory,
    CredentialsMiddlewareService,
    API_KEY_HEADER,
    API_KEY_QUERY_PARAM,
    TENANT_ID_HEADER,
    TENANT_SIGNATURE_HEADER,
};
