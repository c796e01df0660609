//! Derived-variable resolution, hourly computation and daily reduction on top of a
//! [`DomainReader`](crate::readers::DomainReader).

pub mod daily;
pub mod dependencies;
pub mod hourly;
pub mod window;
