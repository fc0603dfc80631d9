//! Account team members, roles and permission checks.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

pub use domain::{MemberStatus, Permission, TeamMember, TeamRole};
pub use repository::TeamRepository;
pub use router::{team_router, ACTOR_HEADER};
pub use service::{TeamError, TeamService};
