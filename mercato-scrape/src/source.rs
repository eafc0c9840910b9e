use mercato_core::MercatoError;
use url::Url;
use url::form_urlencoded::byte_serialize;

/// Where one category's listing lives and how its raw pages are addressed.
#[derive(Debug, Clone)]
pub struct CategorySource {
    base: Url,
    page_param: Option<String>,
    first_page: usize,
    max_raw_pages: usize,
    stable_order: bool,
    quote_url: Option<String>,
}

impl CategorySource {
    /// Single-document listing at `url`.
    ///
    /// # Errors
    /// Returns `InvalidArg` when `url` is not an absolute URL.
    pub fn new(url: &str) -> Result<Self, MercatoError> {
        let base = Url::parse(url).map_err(|e| MercatoError::InvalidArg(format!("bad url {url:?}: {e}")))?;
        Ok(Self {
            base,
            page_param: None,
            first_page: 1,
            max_raw_pages: 1,
            stable_order: true,
            quote_url: None,
        })
    }

    /// Read up to `max_raw_pages` raw pages, numbered through the `param` query parameter.
    #[must_use]
    pub fn paged(mut self, param: impl Into<String>, max_raw_pages: usize) -> Self {
        self.page_param = Some(param.into());
        self.max_raw_pages = max_raw_pages.max(1);
        self
    }

    /// Number of the first raw page (default 1).
    #[must_use]
    pub const fn first_page(mut self, n: usize) -> Self {
        self.first_page = n;
        self
    }

    /// The source does not return rows in a stable order; listings are sorted by symbol.
    #[must_use]
    pub const fn unstable_order(mut self) -> Self {
        self.stable_order = false;
        self
    }

    /// Per-symbol quote page used for references the listing left unpriced.
    ///
    /// # Errors
    /// Returns `InvalidArg` unless the template contains `{symbol}` and
    /// yields an absolute URL.
    pub fn with_quote_url(mut self, template: impl Into<String>) -> Result<Self, MercatoError> {
        let template = template.into();
        if !template.contains("{symbol}") {
            return Err(MercatoError::InvalidArg(format!(
                "quote url {template:?} lacks a {{symbol}} placeholder"
            )));
        }
        Url::parse(&template.replace("{symbol}", "X"))
            .map_err(|e| MercatoError::InvalidArg(format!("bad quote url {template:?}: {e}")))?;
        self.quote_url = Some(template);
        Ok(self)
    }

    /// Maximum number of raw pages read per listing.
    #[must_use]
    pub const fn max_raw_pages(&self) -> usize {
        self.max_raw_pages
    }

    /// Whether rows arrive in a stable order.
    #[must_use]
    pub const fn is_stable(&self) -> bool {
        self.stable_order
    }

    /// URL of the raw page at zero-based `index`.
    #[must_use]
    pub fn page_url(&self, index: usize) -> String {
        let mut url = self.base.clone();
        if let Some(param) = &self.page_param {
            let n = self.first_page + index;
            url.query_pairs_mut().append_pair(param, &n.to_string());
        }
        url.into()
    }

    /// Quote URL for `symbol`, if a template was configured.
    #[must_use]
    pub fn quote_url(&self, symbol: &str) -> Option<String> {
        let encoded: String = byte_serialize(symbol.as_bytes()).collect();
        self.quote_url
            .as_ref()
            .map(|t| t.replace("{symbol}", &encoded))
    }
}
