/// Behavior switches for a [`DocumentManager`](crate::DocumentManager).
///
/// With the `config` feature the options are serde-(de)serializable; missing
/// fields take their defaults.
///
/// # Examples
///
/// ```
/// use ferrous_docs::ManagerOptions;
///
/// let options = ManagerOptions {
///     activate_fallback_on_close: true,
///     ..ManagerOptions::default()
/// };
/// assert!(options.show_on_create);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct ManagerOptions {
    /// Show and activate a document right after it is created
    pub show_on_create: bool,
    /// Use the synthesized placeholder view when a name resolves to nothing
    /// and no fallback constructor is set. When false, creation fails.
    pub error_placeholder: bool,
    /// When the active document closes, activate the most recently
    /// registered remaining document instead of clearing the selection
    pub activate_fallback_on_close: bool,
}

impl Default for ManagerOptions {
    fn default() -> Self {
        Self {
            show_on_create: true,
            error_placeholder: true,
            activate_fallback_on_close: false,
        }
    }
}

#[cfg(feature = "config")]
impl ManagerOptions {
    /// Parses options from JSON.
    ///
    /// ```
    /// use ferrous_docs::ManagerOptions;
    ///
    /// let options = ManagerOptions::from_json(r#"{ "show_on_create": false }"#).unwrap();
    /// assert!(!options.show_on_create);
    /// assert!(options.error_placeholder);
    /// ```
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
