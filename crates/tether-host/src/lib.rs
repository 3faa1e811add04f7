//! Built-in tools and configuration for the `tether-host` binary.
//!
//! The protocol side lives in the `tether` crate ([`tether::host::Host`]);
//! this crate decides *which* tools a host serves.
//!
//! ```ignore
//! use tether::host::Host;
//! use tether_host::config::HostConfig;
//!
//! let registry = HostConfig::default().with_offline(true).build_registry();
//! Host::new(registry).serve_stdio().await?;
//! ```
//!
//! | Tool | Name | Network |
//! |------|------|---------|
//! | [`tools::echo()`] | `echo` | no |
//! | [`tools::CurrentDay`] | `current_day` | no |
//! | [`tools::Weather`] | `weather` | wttr.in |
//! | [`tools::CountryInfo`] | `country_info` | restcountries.com |

pub mod config;
pub mod tools;
