//! HTTP API handlers

pub mod auth;
pub mod bills;
pub mod committees;
pub mod extract;
pub mod health;
pub mod lobbyists;
pub mod members;
pub mod parties;
pub mod tags;
pub mod votes;

pub use auth::{login, login_page, logout};
pub use bills::{bill_detail, list_bills};
pub use committees::{committee_meetings, meeting_detail};
pub use health::health_routes;
pub use lobbyists::list_lobbyists;
pub use members::{list_members, member_detail};
pub use parties::{list_parties, party_detail};
pub use tags::{submit_tags, vote_on_tag};
pub use votes::{list_votes, tagged_votes, vote_detail};
