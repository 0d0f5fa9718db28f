/// Configuration macros
///
/// `config_struct!` declares a configuration section with its defaults next
/// to each field.

/// Define a configuration struct with embedded defaults
///
/// Generates the struct with public fields, a `Default` implementation built
/// from the declared values, and serde support where missing keys fall back
/// to those defaults.
///
/// # Example
/// ```
/// logcast::config_struct! {
///     pub struct ExampleConfig {
///         queue_capacity: usize = 1024,
///         greeting: String = "Welcome".to_string(),
///     }
/// }
///
/// let cfg: ExampleConfig = toml::from_str("queue_capacity = 8").unwrap();
/// assert_eq!(cfg.queue_capacity, 8);
/// assert_eq!(cfg.greeting, "Welcome");
/// ```
#[macro_export]
macro_rules! config_struct {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field_name:ident: $field_type:ty = $default_value:expr
            ),*
            $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
        #[serde(default)]
        $vis struct $name {
            $(
                $(#[$field_meta])*
                pub $field_name: $field_type,
            )*
        }

        impl Default for $name {
            fn default() -> Self {
                Self {
                    $(
                        $field_name: $default_value,
                    )*
                }
            }
        }
    };
}
