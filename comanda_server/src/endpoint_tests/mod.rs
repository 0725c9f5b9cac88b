mod auth;
mod feed;
mod helpers;
mod mocks;
mod notifications;
mod orders;
