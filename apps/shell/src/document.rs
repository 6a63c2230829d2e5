//! # Document Model
//!
//! The shell's stand-in for the host page: a title, one content container
//! and a head holding stylesheet and script elements.
//!
//! ## Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  title: "Catalog"                                                       │
//! │                                                                         │
//! │  head                                                                   │
//! │  ├── <link  data-module="login"   href="modules/login/login.css">       │
//! │  ├── <link  data-module="catalog" href="modules/catalog/catalog.css">   │
//! │  └── <script data-module="catalog" src="modules/catalog/catalog.js">    │
//! │                                                                         │
//! │  container                                                              │
//! │  └── markup of the mounted module                                       │
//! │       ├── region "products"   ◄── filled by the catalog module          │
//! │       └── region "cart-count"                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Stylesheets accumulate (one per module name, ever). Scripts are replaced
//! on every load. The loader owns the container and head; page modules only
//! write their regions.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Markup shown while a module's resources are being fetched.
pub const LOADING_PLACEHOLDER: &str = "<div class=\"module-loading\">Loading…</div>";

/// Kind of a head element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadElementKind {
    Stylesheet,
    Script,
}

/// A `<link>` or `<script>` tagged with the module that owns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadElement {
    pub kind: HeadElementKind,
    /// Value of the per-module marker attribute.
    pub module: String,
    pub src: String,
}

/// Page state mutated by the loader.
#[derive(Debug, Default)]
pub struct Document {
    title: String,
    container: String,
    regions: BTreeMap<String, String>,
    head: Vec<HeadElement>,
    mounted_seq: u64,
}

impl Document {
    /// Creates a blank document.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    /// Replaces the container content. Regions of the previous content are
    /// discarded and no module instance owns the new content yet.
    pub fn replace_container(&mut self, markup: impl Into<String>) {
        self.container = markup.into();
        self.regions.clear();
        self.mounted_seq = 0;
    }

    /// Hands the container to the module instance created by load `seq`.
    pub fn claim_container(&mut self, seq: u64) {
        self.mounted_seq = seq;
    }

    /// Load sequence number of the instance owning the container, 0 if none.
    pub fn mounted_seq(&self) -> u64 {
        self.mounted_seq
    }

    /// Fills a named region. Ignored unless load `seq` owns the container.
    ///
    /// Returns true if the region was written.
    pub fn render_region(&mut self, seq: u64, region: &str, markup: impl Into<String>) -> bool {
        if seq == 0 || seq != self.mounted_seq {
            return false;
        }
        self.regions.insert(region.to_string(), markup.into());
        true
    }

    pub fn region(&self, region: &str) -> Option<&str> {
        self.regions.get(region).map(String::as_str)
    }

    pub fn regions(&self) -> &BTreeMap<String, String> {
        &self.regions
    }

    pub fn head(&self) -> &[HeadElement] {
        &self.head
    }

    /// Returns true if a stylesheet tagged for `module` is attached.
    pub fn has_stylesheet_for(&self, module: &str) -> bool {
        self.count(HeadElementKind::Stylesheet, module) > 0
    }

    /// Appends a stylesheet tagged for `module`.
    pub fn attach_stylesheet(&mut self, module: &str, href: &str) {
        self.head.push(HeadElement {
            kind: HeadElementKind::Stylesheet,
            module: module.to_string(),
            src: href.to_string(),
        });
    }

    /// Removes every script tagged for `module`. Returns how many were removed.
    pub fn remove_scripts_for(&mut self, module: &str) -> usize {
        let before = self.head.len();
        self.head
            .retain(|el| !(el.kind == HeadElementKind::Script && el.module == module));
        before - self.head.len()
    }

    /// Removes every script element. Returns how many were removed.
    pub fn clear_scripts(&mut self) -> usize {
        let before = self.head.len();
        self.head.retain(|el| el.kind != HeadElementKind::Script);
        before - self.head.len()
    }

    /// Appends a script tagged for `module`.
    pub fn insert_script(&mut self, module: &str, src: &str) {
        self.head.push(HeadElement {
            kind: HeadElementKind::Script,
            module: module.to_string(),
            src: src.to_string(),
        });
    }

    /// Number of head elements of `kind` tagged for `module`.
    pub fn count(&self, kind: HeadElementKind, module: &str) -> usize {
        self.head
            .iter()
            .filter(|el| el.kind == kind && el.module == module)
            .count()
    }

    /// Plain-text dump for the console.
    pub fn render_text(&self) -> String {
        let mut out = format!("== {} ==\n{}\n", self.title, self.container);
        for (name, markup) in &self.regions {
            out.push_str(&format!("-- {name} --\n{markup}\n"));
        }
        out
    }
}

/// Shared handle to the single document.
#[derive(Debug, Clone, Default)]
pub struct DocumentHandle {
    inner: Arc<Mutex<Document>>,
}

impl DocumentHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the document. Never hold the guard across an await.
    pub fn lock(&self) -> MutexGuard<'_, Document> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn title(&self) -> String {
        self.lock().title().to_string()
    }

    pub fn container(&self) -> String {
        self.lock().container().to_string()
    }

    pub fn region(&self, region: &str) -> Option<String> {
        self.lock().region(region).map(str::to_string)
    }
}

/// Escapes text for inclusion in markup.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripts_are_replaced_per_module() {
        let mut doc = Document::new();
        doc.insert_script("catalog", "modules/catalog/catalog.js");
        doc.insert_script("cart", "modules/cart/cart.js");

        assert_eq!(doc.remove_scripts_for("catalog"), 1);
        doc.insert_script("catalog", "modules/catalog/catalog.js");

        assert_eq!(doc.count(HeadElementKind::Script, "catalog"), 1);
        assert_eq!(doc.count(HeadElementKind::Script, "cart"), 1);
    }

    #[test]
    fn test_clear_scripts_keeps_stylesheets() {
        let mut doc = Document::new();
        doc.attach_stylesheet("catalog", "modules/catalog/catalog.css");
        doc.insert_script("catalog", "modules/catalog/catalog.js");
        doc.insert_script("cart", "modules/cart/cart.js");

        assert_eq!(doc.clear_scripts(), 2);
        assert_eq!(doc.count(HeadElementKind::Script, "cart"), 0);
        assert_eq!(doc.count(HeadElementKind::Stylesheet, "catalog"), 1);
    }

    #[test]
    fn test_regions_belong_to_the_claiming_load() {
        let mut doc = Document::new();
        doc.replace_container("<section data-region=\"products\"></section>");
        doc.claim_container(3);

        assert!(doc.render_region(3, "products", "<ul></ul>"));
        assert!(!doc.render_region(2, "products", "stale"));
        assert_eq!(doc.region("products"), Some("<ul></ul>"));

        doc.replace_container("next");
        assert!(doc.region("products").is_none());
        assert!(!doc.render_region(3, "products", "late"));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("a < b & \"c\""), "a &lt; b &amp; &quot;c&quot;");
    }
}
