//! Component labeler: a fixed-priority rule cascade that assigns address
//! labels to token spans.
//!
//! Rules run in order and only ever claim tokens no earlier rule claimed:
//!
//! 1. leading numeric token → `house_number`
//! 2. trailing postal-code-shaped token (or token pair), optionally followed
//!    by a country phrase → `postcode`
//! 3. rightmost state code at a field boundary → `state`
//! 4. trailing country phrase → `country`
//! 5. unit / level / PO box designators with their numbers
//! 6. leftover spans: `road` right after the house number, `city` otherwise
//!
//! When rules 1-5 find nothing, leftover spans are dropped instead of being
//! guessed at.

use std::ops::RangeInclusive;
use std::sync::Arc;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::dictionary::Dictionary;
use crate::error::{Error, Result};
use crate::types::{Label, LabeledComponent, Token, TokenTag};

static ZIP_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{5}(?:-\d{4})?$").unwrap());
static POSTAL_SINGLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[a-z]{1,2}\d[a-z\d]?\d[a-z]{2}|[a-z]\d[a-z]\d[a-z]\d)$").unwrap()
});
static POSTAL_OUTWARD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[a-z]{1,2}\d[a-z\d]?|[a-z]\d[a-z])$").unwrap());
static POSTAL_INWARD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\d[a-z]{2}|\d[a-z]\d)$").unwrap());

/// Rule-cascade labeler over a dictionary's state and country sets.
#[derive(Debug, Clone)]
pub struct Labeler {
    dictionary: Arc<Dictionary>,
}

impl Labeler {
    /// Create a labeler over `dictionary`.
    pub fn new(dictionary: Arc<Dictionary>) -> Self {
        Self { dictionary }
    }

    /// Label classified tokens.
    ///
    /// Returns components ordered by position with unique labels; a later
    /// span with an already used label replaces the earlier one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyInput`] when `tokens` is empty. Pure punctuation
    /// yields an empty result rather than an error.
    pub fn label(&self, tokens: &[Token]) -> Result<Vec<LabeledComponent>> {
        if tokens.is_empty() {
            return Err(Error::empty_input("label"));
        }

        let mut pass = Pass::new(tokens);
        if pass.words.is_empty() {
            return Ok(Vec::new());
        }

        pass.house_number();
        let country = pass.country_candidate(&self.dictionary);
        pass.postcode(country.as_ref());
        // A country written after the postcode is only visible once it is claimed.
        let country = country.or_else(|| pass.country_candidate(&self.dictionary));
        pass.state(&self.dictionary, country.as_ref());
        pass.country(country);
        pass.designators();

        let spans = if pass.has_markers() {
            pass.leftover_spans()
        } else {
            Vec::new()
        };

        Ok(pass.finish(spans))
    }
}

struct Pass<'a> {
    tokens: &'a [Token],
    /// Indices into `tokens` of the word (non-punctuation) tokens.
    words: Vec<usize>,
    labels: Vec<Option<Label>>,
    spans: Vec<(Label, RangeInclusive<usize>)>,
    house: Option<usize>,
}

impl<'a> Pass<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        let words: Vec<usize> = tokens
            .iter()
            .enumerate()
            .filter(|(_, token)| token.is_word())
            .map(|(index, _)| index)
            .collect();

        Self {
            tokens,
            labels: vec![None; words.len()],
            words,
            spans: Vec::new(),
            house: None,
        }
    }

    fn word(&self, w: usize) -> &Token {
        &self.tokens[self.words[w]]
    }

    fn is_free(&self, w: usize) -> bool {
        self.labels[w].is_none()
    }

    fn claim(&mut self, label: Label, range: RangeInclusive<usize>) {
        for w in range.clone() {
            self.labels[w] = Some(label);
        }
        self.spans.push((label, range));
    }

    /// Whether word `w` is followed by punctuation or the end of input.
    fn at_field_end(&self, w: usize) -> bool {
        match self.tokens.get(self.words[w] + 1) {
            None => true,
            Some(next) => !next.is_word(),
        }
    }

    /// Whether word `w` directly follows punctuation.
    fn after_punctuation(&self, w: usize) -> bool {
        let index = self.words[w];
        index > 0 && !self.tokens[index - 1].is_word()
    }

    /// Whether words `w` and `w + 1` have no punctuation between them.
    fn contiguous(&self, w: usize) -> bool {
        self.words[w + 1] == self.words[w] + 1
    }

    fn house_number(&mut self) {
        let tag = self.word(0).tag();
        if matches!(tag, TokenTag::Number | TokenTag::Alphanumeric) {
            self.house = Some(0);
            self.claim(Label::HouseNumber, 0..=0);
        }
    }

    /// Postcode must be the last word, or sit right before the trailing
    /// country phrase.
    fn postcode(&mut self, country: Option<&RangeInclusive<usize>>) {
        let end = match country {
            Some(range) => *range.start(),
            None => self.words.len(),
        };
        if end == 0 || !self.is_free(end - 1) {
            return;
        }

        let w = end - 1;
        let text = self.word(w).text();

        if w > 0
            && self.is_free(w - 1)
            && self.contiguous(w - 1)
            && POSTAL_INWARD.is_match(text)
            && POSTAL_OUTWARD.is_match(self.word(w - 1).text())
            // "a1 2nd" is a road and an ordinal unless it opens its own field.
            && (self.word(w).tag() != TokenTag::Ordinal || self.after_punctuation(w - 1))
        {
            self.claim(Label::Postcode, w - 1..=w);
            return;
        }

        if ZIP_CODE.is_match(text) || POSTAL_SINGLE.is_match(text) {
            self.claim(Label::Postcode, w..=w);
        }
    }

    /// Trailing country phrase, skipping trailing words already claimed.
    fn country_candidate(&self, dictionary: &Dictionary) -> Option<RangeInclusive<usize>> {
        let end = (0..self.words.len()).rev().find(|&w| self.is_free(w))?;
        let longest = dictionary.max_country_words().min(end + 1);
        for len in (1..=longest).rev() {
            let start = end + 1 - len;
            if !(start..=end).all(|w| self.is_free(w)) {
                continue;
            }
            let phrase = (start..=end)
                .map(|w| self.word(w).text())
                .collect::<Vec<_>>()
                .join(" ");
            if dictionary.is_country(&phrase) {
                return Some(start..=end);
            }
        }

        None
    }

    fn state(&mut self, dictionary: &Dictionary, country: Option<&RangeInclusive<usize>>) {
        for w in (1..self.words.len()).rev() {
            let token = self.word(w);
            if !self.is_free(w)
                || token.text().chars().count() != 2
                || !dictionary.is_state(token.text())
            {
                continue;
            }
            if country.is_some_and(|range| range.contains(&w)) {
                continue;
            }

            let next = w + 1;
            let strong = next < self.words.len()
                && (self.labels[next] == Some(Label::Postcode)
                    || country.is_some_and(|range| *range.start() == next));
            let weak = self.at_field_end(w);

            // Codes that double as street words ("ct", "ne") need stronger evidence.
            let accepted = if token.tag() == TokenTag::State {
                strong || weak
            } else {
                strong || (weak && self.after_punctuation(w))
            };

            if accepted {
                self.claim(Label::State, w..=w);
                return;
            }
        }
    }

    fn country(&mut self, candidate: Option<RangeInclusive<usize>>) {
        if let Some(range) = candidate {
            if range.clone().all(|w| self.is_free(w)) {
                self.claim(Label::Country, range);
            }
        }
    }

    fn designators(&mut self) {
        let mut w = 0;
        while w < self.words.len() {
            if !self.is_free(w) {
                w += 1;
                continue;
            }

            let tag = self.word(w).tag();
            if let Some(label) = designator_label(tag) {
                let mut last = w;
                while last + 1 < self.words.len()
                    && self.is_free(last + 1)
                    && self.word(last + 1).tag() == tag
                {
                    last += 1;
                }

                let number = last + 1;
                if number < self.words.len()
                    && self.is_free(number)
                    && self.word(number).tag().is_numeric()
                {
                    self.claim(label, w..=number);
                    w = number + 1;
                    continue;
                }
            } else if matches!(tag, TokenTag::Ordinal | TokenTag::Number)
                && w + 1 < self.words.len()
                && self.is_free(w + 1)
                && self.word(w + 1).tag() == TokenTag::Level
            {
                self.claim(Label::Level, w..=w + 1);
                w += 2;
                continue;
            }

            w += 1;
        }
    }

    fn has_markers(&self) -> bool {
        !self.spans.is_empty()
    }

    /// Maximal runs of unclaimed, punctuation-free words, labeled road or city.
    fn leftover_spans(&self) -> Vec<(Label, RangeInclusive<usize>)> {
        let mut runs = Vec::new();
        let mut w = 0;
        while w < self.words.len() {
            if !self.is_free(w) {
                w += 1;
                continue;
            }
            let start = w;
            while w + 1 < self.words.len() && self.is_free(w + 1) && self.contiguous(w) {
                w += 1;
            }
            runs.push(start..=w);
            w += 1;
        }

        let mut spans = Vec::new();
        for run in runs {
            let (start, end) = (*run.start(), *run.end());
            if self.house.is_some_and(|house| start == house + 1) {
                let road_end = self.road_end(start, end);
                spans.push((Label::Road, start..=road_end));
                if road_end < end {
                    spans.push((Label::City, road_end + 1..=end));
                }
            } else {
                spans.push((Label::City, run));
            }
        }
        spans
    }

    /// Road ends after the first street type past its first word, plus any
    /// directionals that follow.
    fn road_end(&self, start: usize, end: usize) -> usize {
        let Some(mut cut) = (start + 1..=end).find(|&w| self.word(w).tag() == TokenTag::StreetType)
        else {
            return end;
        };
        while cut < end && self.word(cut + 1).tag() == TokenTag::Directional {
            cut += 1;
        }
        cut
    }

    fn finish(self, leftover: Vec<(Label, RangeInclusive<usize>)>) -> Vec<LabeledComponent> {
        let mut spans: Vec<_> = self.spans.iter().cloned().chain(leftover).collect();
        spans.sort_by_key(|(_, range)| *range.start());

        let mut components: IndexMap<Label, String> = IndexMap::new();
        for (label, range) in spans {
            let value = range
                .map(|w| self.word(w).text())
                .collect::<Vec<_>>()
                .join(" ");
            components.shift_remove(&label);
            components.insert(label, value);
        }

        components
            .into_iter()
            .map(|(label, value)| LabeledComponent::new(label, value))
            .collect()
    }
}

fn designator_label(tag: TokenTag) -> Option<Label> {
    match tag {
        TokenTag::Unit => Some(Label::Unit),
        TokenTag::Level => Some(Label::Level),
        TokenTag::PoBox => Some(Label::PoBox),
        _ => None,
    }
}
