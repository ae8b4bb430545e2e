//! Clients for the Google APIs the gateway calls with the user's token.

pub mod drive;
pub mod people;

pub use drive::{DriveClient, DriveFile};
pub use people::{PeopleClient, Person};
