//! Expansion of CSS custom properties declared on `:root`.

/// Replace `var(--name)` references with the value `--name` is given in a top-level rule whose
/// selector list contains `:root`. Returns how many references were replaced.
///
/// A reference to an undeclared property uses its fallback if it has a non-empty one and is
/// otherwise left alone, as is a reference that would recurse into itself. The declarations
/// themselves are kept.
pub(crate) fn expand<'i>(stylesheet: &mut StyleSheet<'i>) -> usize {
    let properties = root_properties(stylesheet);
    let mut inliner = Inliner {
        properties: &properties,
        substitutions: 0,
    };
    match stylesheet.visit(&mut inliner) {
        Ok(()) => {}
        Err(never) => match never {},
    }
    inliner.substitutions
}

fn root_properties<'i>(stylesheet: &StyleSheet<'i>) -> HashMap<String, TokenList<'i>> {
    let mut properties = HashMap::new();

    for rule in &stylesheet.rules.0 {
        let CssRule::Style(rule) = rule else {
            continue;
        };
        if !rule.selectors.0.iter().any(is_root) {
            continue;
        }
        let block = &rule.declarations;
        // `!important` wins over a normal declaration in the same block.
        for property in block.declarations.iter().chain(&block.important_declarations) {
            if let Property::Custom(CustomProperty {
                name: CustomPropertyName::Custom(name),
                value,
            }) = property
            {
                properties.insert(name.0.to_string(), value.clone());
            }
        }
    }

    properties
}

fn is_root(selector: &Selector<'_>) -> bool {
    matches!(selector.iter_raw_match_order().as_slice(), [Component::Root])
}

struct Inliner<'a, 'i> {
    properties: &'a HashMap<String, TokenList<'i>>,
    substitutions: usize,
}

impl<'i> Visitor<'i> for Inliner<'_, 'i> {
    type Error = Infallible;

    fn visit_types(&self) -> VisitTypes {
        visit_types!(TOKENS | VARIABLES)
    }

    fn visit_token_list(&mut self, tokens: &mut TokenList<'i>) -> Result<(), Self::Error> {
        // Names expanded at the current position, to stop on cycles.
        let mut active = HashSet::new();
        let mut i = 0;

        while i < tokens.0.len() {
            let token = &mut tokens.0[i];
            token.visit(self)?;

            if let TokenOrValue::Var(var) = token {
                let name = var.name.ident.0.as_ref();
                let replacement = match self.properties.get(name) {
                    Some(value) => Some(value.0.clone()),
                    None => var
                        .fallback
                        .as_ref()
                        .filter(|fallback| !fallback.0.iter().all(TokenOrValue::is_whitespace))
                        .map(|fallback| fallback.0.clone()),
                };
                if let Some(replacement) = replacement {
                    if active.insert(name.to_owned()) {
                        tokens.0.splice(i..=i, replacement);
                        self.substitutions += 1;
                        // The replacement may itself contain references.
                        continue;
                    }
                }
            }

            active.clear();
            i += 1;
        }

        Ok(())
    }
}


use lightningcss::properties::custom::CustomProperty;
use lightningcss::properties::custom::CustomPropertyName;
use lightningcss::properties::custom::TokenList;
use lightningcss::properties::custom::TokenOrValue;
use lightningcss::properties::Property;
use lightningcss::rules::CssRule;
use lightningcss::selector::Component;
use lightningcss::selector::Selector;
use lightningcss::stylesheet::StyleSheet;
use lightningcss::visit_types;
use lightningcss::visitor::Visit as _;
use lightningcss::visitor::VisitTypes;
use lightningcss::visitor::Visitor;
use std::collections::HashMap;
use std::collections::HashSet;
use std::convert::Infallible;
