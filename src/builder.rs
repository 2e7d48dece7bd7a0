//! Registration surface for parsers
//!
//! A [`ParserBuilder`] is handed to the configuration closure of
//! [`Parser::new`]. Every registration appends exactly one converter and
//! comes in two shapes: a callback receiving `(value, instance)`, and an
//! `_into` form taking a field accessor `Fn(&mut V) -> &mut P`. The accessor
//! form is a thin wrapper that builds the equivalent callback.
//!
//! Selectors are compiled as they are registered. The first invalid one is
//! kept and reported by [`ParserBuilder::build`].

use std::collections::HashMap;
use std::hash::Hash;
use std::iter;

use chrono::{NaiveDate, NaiveDateTime};

use crate::coerce::{parse_date, parse_datetime, Coerce};
use crate::converter::{Converter, ConverterKind, MatchPolicy};
use crate::error::{Error, Result};
use crate::node::{Extract, Node};
use crate::options::{EmptySelectorPolicy, ParseOptions};
use crate::parser::{apply_all, Generator, Parser};

pub struct ParserBuilder<V> {
    generator: Option<Generator<V>>,
    converters: Vec<Converter<V>>,
    options: ParseOptions,
    error: Option<Error>,
}

impl<V: 'static> Default for ParserBuilder<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: 'static> ParserBuilder<V> {
    pub fn new() -> Self {
        Self::with_options(ParseOptions::default())
    }

    pub fn with_options(options: ParseOptions) -> Self {
        Self {
            generator: None,
            converters: Vec::new(),
            options,
            error: None,
        }
    }

    /// Factory for a fresh result instance per parse
    pub fn generator<G>(&mut self, generator: G) -> &mut Self
    where
        G: Fn() -> V + Send + Sync + 'static,
    {
        self.generator = Some(Box::new(generator));
        self
    }

    /// Start every parse from a copy of `instance`
    pub fn instance(&mut self, instance: V) -> &mut Self
    where
        V: Clone + Send + Sync,
    {
        self.generator(move || instance.clone())
    }

    /// Replace the options. Only affects converters registered afterwards.
    pub fn options(&mut self, options: ParseOptions) -> &mut Self {
        self.options = options;
        self
    }

    pub fn build(self) -> Result<Parser<V>> {
        if let Some(error) = self.error {
            return Err(error);
        }
        let generator = self.generator.ok_or(Error::MissingInstanceGenerator)?;
        Ok(Parser::from_parts(generator, self.converters, self.options))
    }

    fn push(&mut self, css: &str, kind: ConverterKind<V>) -> &mut Self {
        if css.trim().is_empty() && self.options.empty_selector == EmptySelectorPolicy::Reject {
            self.record_error(Error::EmptySelector);
            return self;
        }
        match Converter::new(css, kind) {
            Ok(converter) => self.converters.push(converter),
            Err(error) => self.record_error(error),
        }
        self
    }

    fn record_error(&mut self, error: Error) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    // Elements

    /// Call `action` with the first match, or `None` when nothing matches
    pub fn select<F>(&mut self, css: &str, action: F) -> &mut Self
    where
        F: Fn(Option<Node<'_>>, &mut V) + Send + Sync + 'static,
    {
        self.push(css, ConverterKind::scalar(MatchPolicy::FirstOnly, action))
    }

    /// Store `extract(first match)` in a field; the field is left alone when
    /// nothing matches
    pub fn select_into<P, E, A>(&mut self, css: &str, extract: E, field: A) -> &mut Self
    where
        P: 'static,
        E: Fn(Node<'_>) -> P + Send + Sync + 'static,
        A: Fn(&mut V) -> &mut P + Send + Sync + 'static,
    {
        self.select(css, move |node, instance| {
            if let Some(node) = node {
                *field(instance) = extract(node);
            }
        })
    }

    /// Call `action` once per match
    pub fn selections<F>(&mut self, css: &str, action: F) -> &mut Self
    where
        F: Fn(Node<'_>, &mut V) + Send + Sync + 'static,
    {
        self.push(
            css,
            ConverterKind::scalar(MatchPolicy::All, move |node, instance| {
                if let Some(node) = node {
                    action(node, instance);
                }
            }),
        )
    }

    /// Hand every match to `action` in a single call
    pub fn elements<F>(&mut self, css: &str, action: F) -> &mut Self
    where
        F: Fn(&[Node<'_>], &mut V) + Send + Sync + 'static,
    {
        self.push(css, ConverterKind::whole_selection(action))
    }

    // Scalars

    /// First match, extracted and coerced to `T` (zero value on failure)
    pub fn value<T, F>(&mut self, css: &str, extract: Extract, action: F) -> &mut Self
    where
        T: Coerce + 'static,
        F: Fn(T, &mut V) + Send + Sync + 'static,
    {
        self.select(css, move |node, instance| {
            action(T::from_node(node.as_ref(), &extract), instance)
        })
    }

    pub fn value_into<T, A>(&mut self, css: &str, extract: Extract, field: A) -> &mut Self
    where
        T: Coerce + 'static,
        A: Fn(&mut V) -> &mut T + Send + Sync + 'static,
    {
        self.value(css, extract, move |value, instance| *field(instance) = value)
    }

    /// Every match, extracted and coerced to `T`
    pub fn values<T, F>(&mut self, css: &str, extract: Extract, action: F) -> &mut Self
    where
        T: Coerce + 'static,
        F: Fn(T, &mut V) + Send + Sync + 'static,
    {
        self.selections(css, move |node, instance| {
            action(T::from_node(Some(&node), &extract), instance)
        })
    }

    pub fn text<F>(&mut self, css: &str, action: F) -> &mut Self
    where
        F: Fn(String, &mut V) + Send + Sync + 'static,
    {
        self.value(css, Extract::Text, action)
    }

    pub fn text_into<A>(&mut self, css: &str, field: A) -> &mut Self
    where
        A: Fn(&mut V) -> &mut String + Send + Sync + 'static,
    {
        self.value_into(css, Extract::Text, field)
    }

    /// Attribute value of the first match, empty when missing
    pub fn attr_into<A>(&mut self, css: &str, name: &str, field: A) -> &mut Self
    where
        A: Fn(&mut V) -> &mut String + Send + Sync + 'static,
    {
        self.value_into(css, Extract::attr(name), field)
    }

    pub fn int<F>(&mut self, css: &str, action: F) -> &mut Self
    where
        F: Fn(i32, &mut V) + Send + Sync + 'static,
    {
        self.value(css, Extract::Text, action)
    }

    pub fn int_into<A>(&mut self, css: &str, field: A) -> &mut Self
    where
        A: Fn(&mut V) -> &mut i32 + Send + Sync + 'static,
    {
        self.value_into(css, Extract::Text, field)
    }

    pub fn long<F>(&mut self, css: &str, action: F) -> &mut Self
    where
        F: Fn(i64, &mut V) + Send + Sync + 'static,
    {
        self.value(css, Extract::Text, action)
    }

    pub fn long_into<A>(&mut self, css: &str, field: A) -> &mut Self
    where
        A: Fn(&mut V) -> &mut i64 + Send + Sync + 'static,
    {
        self.value_into(css, Extract::Text, field)
    }

    pub fn float<F>(&mut self, css: &str, action: F) -> &mut Self
    where
        F: Fn(f32, &mut V) + Send + Sync + 'static,
    {
        self.value(css, Extract::Text, action)
    }

    pub fn float_into<A>(&mut self, css: &str, field: A) -> &mut Self
    where
        A: Fn(&mut V) -> &mut f32 + Send + Sync + 'static,
    {
        self.value_into(css, Extract::Text, field)
    }

    pub fn double<F>(&mut self, css: &str, action: F) -> &mut Self
    where
        F: Fn(f64, &mut V) + Send + Sync + 'static,
    {
        self.value(css, Extract::Text, action)
    }

    pub fn double_into<A>(&mut self, css: &str, field: A) -> &mut Self
    where
        A: Fn(&mut V) -> &mut f64 + Send + Sync + 'static,
    {
        self.value_into(css, Extract::Text, field)
    }

    pub fn bool<F>(&mut self, css: &str, action: F) -> &mut Self
    where
        F: Fn(bool, &mut V) + Send + Sync + 'static,
    {
        self.value(css, Extract::Text, action)
    }

    pub fn bool_into<A>(&mut self, css: &str, field: A) -> &mut Self
    where
        A: Fn(&mut V) -> &mut bool + Send + Sync + 'static,
    {
        self.value_into(css, Extract::Text, field)
    }

    /// First match's text parsed with a `chrono` format, `None` on mismatch
    pub fn date<F>(&mut self, css: &str, format: &str, action: F) -> &mut Self
    where
        F: Fn(Option<NaiveDate>, &mut V) + Send + Sync + 'static,
    {
        let format = format.to_string();
        self.select(css, move |node, instance| {
            let date = node.and_then(|node| parse_date(&node.text(), &format));
            action(date, instance)
        })
    }

    pub fn date_into<A>(&mut self, css: &str, format: &str, field: A) -> &mut Self
    where
        A: Fn(&mut V) -> &mut Option<NaiveDate> + Send + Sync + 'static,
    {
        self.date(css, format, move |date, instance| *field(instance) = date)
    }

    /// Like [`date`](Self::date) for a date and time of day
    pub fn datetime<F>(&mut self, css: &str, format: &str, action: F) -> &mut Self
    where
        F: Fn(Option<NaiveDateTime>, &mut V) + Send + Sync + 'static,
    {
        let format = format.to_string();
        self.select(css, move |node, instance| {
            let datetime = node.and_then(|node| parse_datetime(&node.text(), &format));
            action(datetime, instance)
        })
    }

    pub fn datetime_into<A>(&mut self, css: &str, format: &str, field: A) -> &mut Self
    where
        A: Fn(&mut V) -> &mut Option<NaiveDateTime> + Send + Sync + 'static,
    {
        self.datetime(css, format, move |datetime, instance| {
            *field(instance) = datetime
        })
    }

    // Collections and maps

    /// Transform every match and hand the ordered results to `action`
    pub fn collect<T, M, F>(&mut self, css: &str, transform: M, action: F) -> &mut Self
    where
        T: 'static,
        M: Fn(Node<'_>) -> T + Send + Sync + 'static,
        F: Fn(Vec<T>, &mut V) + Send + Sync + 'static,
    {
        self.push(
            css,
            ConverterKind::collection(move |nodes, instance| {
                let items = nodes.iter().map(|node| transform(*node)).collect();
                action(items, instance)
            }),
        )
    }

    /// Append the transformed matches to a collection field
    pub fn collection<T, C, M, A>(&mut self, css: &str, transform: M, field: A) -> &mut Self
    where
        T: 'static,
        C: Extend<T> + 'static,
        M: Fn(Node<'_>) -> T + Send + Sync + 'static,
        A: Fn(&mut V) -> &mut C + Send + Sync + 'static,
    {
        self.collect(css, transform, move |items, instance| {
            field(instance).extend(items)
        })
    }

    /// Build a map from every match (last duplicate key wins) and hand it to
    /// `action`
    pub fn map_with<K, T, KF, TF, F>(&mut self, css: &str, key: KF, value: TF, action: F) -> &mut Self
    where
        K: Eq + Hash + 'static,
        T: 'static,
        KF: Fn(Node<'_>) -> K + Send + Sync + 'static,
        TF: Fn(Node<'_>) -> T + Send + Sync + 'static,
        F: Fn(HashMap<K, T>, &mut V) + Send + Sync + 'static,
    {
        self.push(
            css,
            ConverterKind::map(move |nodes, instance| {
                let entries: HashMap<K, T> = nodes
                    .iter()
                    .map(|node| (key(*node), value(*node)))
                    .collect();
                action(entries, instance)
            }),
        )
    }

    /// Merge the extracted entries into a map field
    pub fn map<K, T, M, KF, TF, A>(&mut self, css: &str, key: KF, value: TF, field: A) -> &mut Self
    where
        K: Eq + Hash + 'static,
        T: 'static,
        M: Extend<(K, T)> + 'static,
        KF: Fn(Node<'_>) -> K + Send + Sync + 'static,
        TF: Fn(Node<'_>) -> T + Send + Sync + 'static,
        A: Fn(&mut V) -> &mut M + Send + Sync + 'static,
    {
        self.map_with(css, key, value, move |entries, instance| {
            field(instance).extend(entries)
        })
    }

    // Nested parsers

    /// Run further registrations against the first match, writing into the
    /// same instance. Nothing runs when the selector does not match.
    pub fn parser<F>(&mut self, css: &str, configure: F) -> &mut Self
    where
        F: FnOnce(&mut ParserBuilder<V>),
    {
        let mut nested = ParserBuilder::with_options(self.options.clone());
        configure(&mut nested);
        if let Some(error) = nested.error {
            self.record_error(error);
            return self;
        }
        let converters = nested.converters;
        self.push(
            css,
            ConverterKind::nested(MatchPolicy::FirstOnly, move |node, instance| {
                apply_all(&converters, Some(node), instance)
            }),
        )
    }

    /// Parse the first match with `parser` and hand the result to `action`
    pub fn nested<T, F>(&mut self, css: &str, parser: Parser<T>, action: F) -> &mut Self
    where
        T: 'static,
        F: Fn(T, &mut V) + Send + Sync + 'static,
    {
        self.push(
            css,
            ConverterKind::nested(MatchPolicy::FirstOnly, move |node, instance| {
                action(parser.parse_node(Some(node)), instance)
            }),
        )
    }

    /// Parse every match with `parser`, one result per match
    pub fn nested_all<T, F>(&mut self, css: &str, parser: Parser<T>, action: F) -> &mut Self
    where
        T: 'static,
        F: Fn(T, &mut V) + Send + Sync + 'static,
    {
        self.push(
            css,
            ConverterKind::nested(MatchPolicy::All, move |node, instance| {
                action(parser.parse_node(Some(node)), instance)
            }),
        )
    }

    /// Append one parsed record per match to a collection field
    pub fn collection_of<T, C, A>(&mut self, css: &str, parser: Parser<T>, field: A) -> &mut Self
    where
        T: 'static,
        C: Extend<T> + 'static,
        A: Fn(&mut V) -> &mut C + Send + Sync + 'static,
    {
        self.nested_all(css, parser, move |item, instance| {
            field(instance).extend(iter::once(item))
        })
    }

    /// [`collection_of`](Self::collection_of) with the record parser built in place
    pub fn collection_with<T, C, G, F, A>(
        &mut self,
        css: &str,
        generator: G,
        configure: F,
        field: A,
    ) -> &mut Self
    where
        T: 'static,
        C: Extend<T> + 'static,
        G: Fn() -> T + Send + Sync + 'static,
        F: FnOnce(&mut ParserBuilder<T>),
        A: Fn(&mut V) -> &mut C + Send + Sync + 'static,
    {
        match Parser::with_options(generator, self.options.clone(), configure) {
            Ok(parser) => self.collection_of(css, parser, field),
            Err(error) => {
                self.record_error(error);
                self
            }
        }
    }

    /// Insert one parsed `(key, value)` entry per match into a map field
    pub fn map_of<K, T, M, A>(&mut self, css: &str, parser: Parser<(K, T)>, field: A) -> &mut Self
    where
        K: 'static,
        T: 'static,
        M: Extend<(K, T)> + 'static,
        A: Fn(&mut V) -> &mut M + Send + Sync + 'static,
    {
        self.nested_all(css, parser, move |entry, instance| {
            field(instance).extend(iter::once(entry))
        })
    }

    /// [`map_of`](Self::map_of) with an entry parser built in place, starting
    /// each entry from default key and value
    pub fn map_entries<K, T, M, F, A>(&mut self, css: &str, configure: F, field: A) -> &mut Self
    where
        K: Default + 'static,
        T: Default + 'static,
        M: Extend<(K, T)> + 'static,
        F: FnOnce(&mut ParserBuilder<(K, T)>),
        A: Fn(&mut V) -> &mut M + Send + Sync + 'static,
    {
        match Parser::with_options(<(K, T)>::default, self.options.clone(), configure) {
            Ok(parser) => self.map_of(css, parser, field),
            Err(error) => {
                self.record_error(error);
                self
            }
        }
    }
}
