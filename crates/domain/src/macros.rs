//! Macro for implementing Display and FromStr for string-backed enums
//!
//! Error kinds and configuration switches travel through logs, config files
//! and environment variables as lowercase identifiers. This macro keeps the
//! two conversions in one place.
//!
//! # Example
//!
//! ```rust
//! use courier_domain::impl_domain_enum_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Channel {
//!     Orders,
//!     Chat,
//! }
//!
//! impl_domain_enum_conversions!(Channel {
//!     Orders => "orders",
//!     Chat => "chat",
//! });
//! ```

/// Implements Display and FromStr traits for string-backed enums
///
/// This macro generates:
/// - Display trait: writes the variant's identifier
/// - FromStr trait: parses case-insensitive strings to enum variants
///
/// Identifiers must be written in lowercase.
#[macro_export]
macro_rules! impl_domain_enum_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => f.write_str($str),)+
                }
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Screen {
        Dashboard,
        OrderDetail,
    }

    impl_domain_enum_conversions!(Screen {
        Dashboard => "dashboard",
        OrderDetail => "order_detail",
    });

    #[test]
    fn display_writes_identifier() {
        assert_eq!(Screen::Dashboard.to_string(), "dashboard");
        assert_eq!(Screen::OrderDetail.to_string(), "order_detail");
    }

    #[test]
    fn from_str_ignores_case_and_padding() {
        assert_eq!(Screen::from_str("DASHBOARD").unwrap(), Screen::Dashboard);
        assert_eq!(Screen::from_str(" Order_Detail ").unwrap(), Screen::OrderDetail);
    }

    #[test]
    fn from_str_names_the_enum_on_error() {
        let err = Screen::from_str("settings").unwrap_err();
        assert_eq!(err, "Invalid Screen: settings");
    }

    mod with_result_alias {
        use std::str::FromStr;

        #[allow(dead_code)]
        type Result<T> = std::result::Result<T, ()>;

        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        enum Mode {
            Live,
        }

        impl_domain_enum_conversions!(Mode {
            Live => "live",
        });

        #[test]
        fn expands_where_a_crate_result_alias_is_in_scope() {
            assert_eq!(Mode::from_str("LIVE").unwrap(), Mode::Live);
            assert_eq!(Mode::Live.to_string(), "live");
        }
    }
}
