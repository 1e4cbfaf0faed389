//! User-facing failure messages.
//!
//! The [`Localizer`] maps each [`Failure`] variant to a display string in the
//! caller's locale. Strings live in a [`FailureCatalog`] keyed by language tag;
//! English, Spanish and Portuguese ship built in and further locales can be
//! registered (or loaded from JSON) without touching the client.

use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};
use thiserror::Error;

use crate::error::Failure;

/// A language tag such as `en`, `es` or `pt-BR`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Locale(String);

impl Locale {
    /// Creates a locale, normalizing `_` separators and case (`pt_br` becomes `pt-br`).
    pub fn new(tag: impl AsRef<str>) -> Self {
        Self(tag.as_ref().trim().replace('_', "-").to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The primary language subtag (`pt` for `pt-br`).
    pub fn language(&self) -> &str {
        self.0.split('-').next().unwrap_or_default()
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Locale {
    fn from(tag: &str) -> Self {
        Locale::new(tag)
    }
}

impl From<String> for Locale {
    fn from(tag: String) -> Self {
        Locale::new(tag)
    }
}

impl From<Locale> for String {
    fn from(locale: Locale) -> Self {
        locale.0
    }
}

/// Supplies the locale a message should be rendered in.
///
/// Implemented for [`Locale`] and plain tags; presentation layers implement it
/// for whatever carries the user's settings.
pub trait LocaleContext {
    fn locale(&self) -> &str;
}

impl LocaleContext for Locale {
    fn locale(&self) -> &str {
        self.as_str()
    }
}

impl LocaleContext for str {
    fn locale(&self) -> &str {
        self
    }
}

impl LocaleContext for String {
    fn locale(&self) -> &str {
        self
    }
}

/// One display string per failure variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(deny_unknown_fields)]
pub struct FailureMessages {
    pub from_json: String,
    pub to_json: String,
    pub unauthorized: String,
    pub not_found: String,
    pub forbidden: String,
    pub server: String,
    pub no_internet_connection: String,
}

impl FailureMessages {
    /// Returns the string for `failure`'s variant.
    pub fn get(&self, failure: &Failure) -> &str {
        match failure {
            Failure::FromJson(_) => &self.from_json,
            Failure::ToJson(_) => &self.to_json,
            Failure::Unauthorized(_) => &self.unauthorized,
            Failure::NotFound(_) => &self.not_found,
            Failure::Forbidden(_) => &self.forbidden,
            Failure::Server(_) => &self.server,
            Failure::NoInternetConnection(_) => &self.no_internet_connection,
        }
    }

    fn english() -> Self {
        Self {
            from_json: "We couldn't read the data we received.".into(),
            to_json: "We couldn't prepare your data to be sent.".into(),
            unauthorized: "Your session has expired. Please sign in again.".into(),
            not_found: "The requested item could not be found.".into(),
            forbidden: "You don't have permission to do that.".into(),
            server: "Something went wrong on our side. Please try again later.".into(),
            no_internet_connection: "No internet connection. Check your network and try again.".into(),
        }
    }

    fn spanish() -> Self {
        Self {
            from_json: "No pudimos leer los datos recibidos.".into(),
            to_json: "No pudimos preparar tus datos para enviarlos.".into(),
            unauthorized: "Tu sesión ha expirado. Vuelve a iniciar sesión.".into(),
            not_found: "No se encontró el elemento solicitado.".into(),
            forbidden: "No tienes permiso para hacer eso.".into(),
            server: "Algo salió mal de nuestro lado. Inténtalo de nuevo más tarde.".into(),
            no_internet_connection: "Sin conexión a internet. Revisa tu red e inténtalo de nuevo.".into(),
        }
    }

    fn portuguese() -> Self {
        Self {
            from_json: "Não foi possível ler os dados recebidos.".into(),
            to_json: "Não foi possível preparar seus dados para envio.".into(),
            unauthorized: "Sua sessão expirou. Entre novamente.".into(),
            not_found: "O item solicitado não foi encontrado.".into(),
            forbidden: "Você não tem permissão para fazer isso.".into(),
            server: "Algo deu errado do nosso lado. Tente novamente mais tarde.".into(),
            no_internet_connection: "Sem conexão com a internet. Verifique sua rede e tente novamente.".into(),
        }
    }
}

/// Failure messages keyed by locale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FailureCatalog(BTreeMap<Locale, FailureMessages>);

impl FailureCatalog {
    /// A catalog with no locales.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The catalog shipped with the crate: `en`, `es` and `pt`.
    pub fn builtin() -> Self {
        Self::empty()
            .with("en", FailureMessages::english())
            .with("es", FailureMessages::spanish())
            .with("pt", FailureMessages::portuguese())
    }

    /// Registers (or replaces) the messages for a locale.
    pub fn insert(&mut self, locale: impl Into<Locale>, messages: FailureMessages) {
        self.0.insert(locale.into(), messages);
    }

    pub fn with(mut self, locale: impl Into<Locale>, messages: FailureMessages) -> Self {
        self.insert(locale, messages);
        self
    }

    /// Looks up the messages for a tag, falling back from `pt-BR` to `pt`.
    pub fn resolve(&self, tag: &str) -> Option<&FailureMessages> {
        let locale = Locale::new(tag);

        self.0
            .get(&locale)
            .or_else(|| self.0.get(&Locale::new(locale.language())))
    }

    pub fn locales(&self) -> impl Iterator<Item = &Locale> {
        self.0.keys()
    }
}

/// Raised when a locale has no messages in the catalog.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocalizeError {
    #[error("no failure messages registered for locale `{0}`")]
    UnsupportedLocale(String),
}

/// Renders failures as user-facing strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Localizer {
    catalog: FailureCatalog,
}

impl Localizer {
    pub fn new(catalog: FailureCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &FailureCatalog {
        &self.catalog
    }

    /// Returns the message for `failure` in the context's locale.
    ///
    /// # Errors
    ///
    /// [`LocalizeError::UnsupportedLocale`] if the catalog has neither the tag
    /// nor its language.
    pub fn try_localize<C>(&self, failure: &Failure, context: &C) -> Result<&str, LocalizeError>
    where
        C: LocaleContext + ?Sized,
    {
        let tag = context.locale();

        self.catalog
            .resolve(tag)
            .map(|messages| messages.get(failure))
            .ok_or_else(|| LocalizeError::UnsupportedLocale(tag.to_string()))
    }

    /// Returns the message for `failure` in the context's locale.
    ///
    /// # Panics
    ///
    /// If the locale cannot be resolved. A missing locale is a setup bug; use
    /// [`try_localize`](Self::try_localize) to handle it instead.
    pub fn localize<C>(&self, failure: &Failure, context: &C) -> &str
    where
        C: LocaleContext + ?Sized,
    {
        match self.try_localize(failure, context) {
            Ok(message) => message,
            Err(err) => panic!("{err}"),
        }
    }
}

impl Default for Localizer {
    fn default() -> Self {
        Self::new(FailureCatalog::builtin())
    }
}
