//! CSS minification, built on lightningcss.

/// How stylesheets are transformed on their way to the output directory.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Options<'a> {
    /// Base that relative `url()` references are rewritten against.
    pub(crate) url_base: Option<&'a str>,
    /// Whether to substitute custom properties declared on `:root`.
    pub(crate) expand_variables: bool,
    /// Whether to minify at all. When false the source is passed through as-is, unless one of the
    /// other transformations needs it parsed, in which case it is pretty-printed.
    pub(crate) minify: bool,
}

impl Default for Options<'_> {
    fn default() -> Self {
        Self {
            url_base: None,
            expand_variables: false,
            minify: true,
        }
    }
}

/// Minify a single stylesheet. `filename` is only used in error messages.
pub(crate) fn css(filename: &str, src: &str, options: &Options<'_>) -> anyhow::Result<String> {
    if !options.minify && options.url_base.is_none() && !options.expand_variables {
        return Ok(src.to_owned());
    }

    let printed = print(filename, src, options)?;
    if printed.substitutions > 0 && options.minify {
        // Substituted values have not been through the minifier yet.
        let again = Options {
            url_base: None,
            expand_variables: false,
            minify: true,
        };
        return Ok(print(filename, &printed.css, &again)?.css);
    }

    Ok(printed.css)
}

struct Printed {
    css: String,
    /// How many `var()` references were expanded.
    substitutions: usize,
}

fn print(filename: &str, src: &str, options: &Options<'_>) -> anyhow::Result<Printed> {
    let parser_options = ParserOptions {
        filename: filename.to_owned(),
        ..ParserOptions::default()
    };
    let mut stylesheet = StyleSheet::parse(src, parser_options)
        .map_err(|e| anyhow!("{e}"))
        .context("failed to parse CSS")?;

    if let Some(base) = options.url_base {
        match stylesheet.visit(&mut RebaseUrls { base }) {
            Ok(()) => {}
            Err(never) => match never {},
        }
    }

    let substitutions = if options.expand_variables {
        variables::expand(&mut stylesheet)
    } else {
        0
    };

    if options.minify {
        stylesheet
            .minify(MinifyOptions::default())
            .map_err(|e| anyhow!("{e}"))
            .context("failed to minify CSS")?;
    }

    let printed = stylesheet
        .to_css(PrinterOptions {
            minify: options.minify,
            ..PrinterOptions::default()
        })
        .map_err(|e| anyhow!("{e}"))
        .context("failed to print CSS")?;

    Ok(Printed {
        css: printed.code,
        substitutions,
    })
}

struct RebaseUrls<'b> {
    base: &'b str,
}

impl<'i> Visitor<'i> for RebaseUrls<'_> {
    type Error = Infallible;

    fn visit_types(&self) -> VisitTypes {
        visit_types!(URLS)
    }

    fn visit_url(&mut self, url: &mut Url<'i>) -> Result<(), Self::Error> {
        if let Some(rebased) = rebase(self.base, &url.url) {
            url.url = rebased.into();
        }
        Ok(())
    }
}

/// Join a relative URL onto `base`. Returns `None` for URLs that are not relative.
fn rebase(base: &str, url: &str) -> Option<String> {
    if url.is_empty() || url.starts_with('/') || url.starts_with('#') || has_scheme(url) {
        return None;
    }
    let url = url.strip_prefix("./").unwrap_or(url);
    let separator = if base.is_empty() || base.ends_with('/') {
        ""
    } else {
        "/"
    };
    Some(format!("{base}{separator}{url}"))
}

fn has_scheme(url: &str) -> bool {
    let Some((scheme, _)) = url.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}


use crate::variables;
use anyhow::anyhow;
use anyhow::Context as _;
use lightningcss::stylesheet::MinifyOptions;
use lightningcss::stylesheet::ParserOptions;
use lightningcss::stylesheet::PrinterOptions;
use lightningcss::stylesheet::StyleSheet;
use lightningcss::values::url::Url;
use lightningcss::visit_types;
use lightningcss::visitor::Visit as _;
use lightningcss::visitor::VisitTypes;
use lightningcss::visitor::Visitor;
use std::convert::Infallible;
