pub mod domain;
pub mod location;
pub mod output;
pub mod query;
pub mod time_axis;
pub mod units;
pub mod variable;
