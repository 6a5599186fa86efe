// Copyright 2022 Matthew Ingwersen.
//
// Licensed under the Apache License, Version 2.0 (the "License"); you
// may not use this file except in compliance with the License. You may
// obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or
// implied. See the License for the specific language governing
// permissions and limitations under the License.

//! A lexical classifier for algorithmically generated domain names.
//!
//! Malware that uses a domain generation algorithm (DGA) contacts its
//! command-and-control servers at pseudo-random names such as
//! `xjw3kq9vtz.net`. Such labels look different from names chosen by
//! people: they tend to be longer, have higher character entropy, more
//! digits, fewer vowels, and long runs of consonants. [`DgaModel`] is a
//! logistic regression over exactly those [`Features`].
//!
//! Models are trained elsewhere and stored as TOML:
//!
//! ```toml
//! positive_label = "ioc"
//! negative_label = "legit"
//! threshold = 0.5
//! bias = -9.0
//!
//! [weights]
//! length = 0.15
//! entropy = 1.6
//! digit_ratio = 6.0
//! vowel_ratio = -4.0
//! consonant_run = 0.5
//! ```

use std::collections::HashMap;
use std::str::FromStr;

use serde::Deserialize;

use crate::platform::Model;

/// The features computed for an input string.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Features {
    /// The number of characters.
    pub length: f64,

    /// The Shannon entropy of the characters, in bits.
    pub entropy: f64,

    /// The fraction of characters that are ASCII digits.
    pub digit_ratio: f64,

    /// The fraction of characters that are vowels (`aeiou`).
    pub vowel_ratio: f64,

    /// The length of the longest run of consecutive ASCII consonants.
    pub consonant_run: f64,
}

impl Features {
    /// Computes the features of `input`. Comparisons are
    /// ASCII-case-insensitive.
    pub fn of(input: &str) -> Self {
        let mut counts: HashMap<char, usize> = HashMap::new();
        let mut total = 0usize;
        let mut digits = 0usize;
        let mut vowels = 0usize;
        let mut run = 0usize;
        let mut longest_run = 0usize;

        for c in input.chars().map(|c| c.to_ascii_lowercase()) {
            total += 1;
            *counts.entry(c).or_insert(0) += 1;
            if c.is_ascii_digit() {
                digits += 1;
            }
            if matches!(c, 'a' | 'e' | 'i' | 'o' | 'u') {
                vowels += 1;
                run = 0;
            } else if c.is_ascii_alphabetic() {
                run += 1;
                longest_run = longest_run.max(run);
            } else {
                run = 0;
            }
        }

        if total == 0 {
            return Self::default();
        }
        let n = total as f64;
        let entropy = counts
            .values()
            .map(|&count| {
                let p = count as f64 / n;
                -p * p.log2()
            })
            .sum();
        Self {
            length: n,
            entropy,
            digit_ratio: digits as f64 / n,
            vowel_ratio: vowels as f64 / n,
            consonant_run: longest_run as f64,
        }
    }
}

/// The per-feature weights of a [`DgaModel`].
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Weights {
    #[serde(default)]
    pub length: f64,
    #[serde(default)]
    pub entropy: f64,
    #[serde(default)]
    pub digit_ratio: f64,
    #[serde(default)]
    pub vowel_ratio: f64,
    #[serde(default)]
    pub consonant_run: f64,
}

/// A logistic regression classifier over [`Features`]. See the
/// [module-level documentation](self).
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DgaModel {
    #[serde(default = "default_positive_label")]
    pub positive_label: String,
    #[serde(default = "default_negative_label")]
    pub negative_label: String,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    pub bias: f64,
    pub weights: Weights,
}

fn default_positive_label() -> String {
    "ioc".to_owned()
}

fn default_negative_label() -> String {
    "legit".to_owned()
}

fn default_threshold() -> f64 {
    0.5
}

impl DgaModel {
    /// Parses a model from its TOML representation.
    pub fn from_toml(bytes: &[u8]) -> Result<Self, toml::de::Error> {
        toml::from_slice(bytes)
    }

    /// Returns the probability that `input` was generated by a DGA.
    pub fn probability(&self, input: &str) -> f64 {
        let x = Features::of(input);
        let w = &self.weights;
        let z = self.bias
            + w.length * x.length
            + w.entropy * x.entropy
            + w.digit_ratio * x.digit_ratio
            + w.vowel_ratio * x.vowel_ratio
            + w.consonant_run * x.consonant_run;
        1.0 / (1.0 + (-z).exp())
    }
}

impl FromStr for DgaModel {
    type Err = toml::de::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        toml::from_str(s)
    }
}

impl Model for DgaModel {
    fn predict(&self, input: &str) -> String {
        if self.probability(input) >= self.threshold {
            self.positive_label.clone()
        } else {
            self.negative_label.clone()
        }
    }
}
