//! Route identifier grammar and normalizer
//!
//! Human-entered route ids arrive in two surface forms and several case
//! conventions; this module reconciles them into one canonical [`RouteId`]:
//!
//! - **LRS form**: a 3-digit mainline number, an optional 2-letter related
//!   route type (ramp, couplet, spur, etc.) with an optional qualifier of up
//!   to 6 alphanumerics, and an optional trailing `i`/`d` travel-direction
//!   suffix — `005`, `005CO`, `005COABERDN`, `005d`.
//! - **Label form**: a signage-style prefix such as `I-5`, `US-101`, or
//!   `SR 8`; the numeric part is zero-padded to three digits and the
//!   direction is left unset.
//!
//! Matching is case-insensitive, with one deliberate exception: the
//! direction suffix is canonically lowercase, so a trailing uppercase `I` or
//! `D` after a related route type reads as qualifier text (`005COD` has
//! qualifier `D`), while lowercase reads as a direction (`005COd` is
//! decreasing). A bare `005D` still parses as decreasing since no qualifier
//! can claim the letter there.

use crate::{LocateError, Result};
use regex::{Captures, Regex};
use std::fmt;
use std::sync::LazyLock;

/// LRS-form grammar. The qualifier is matched lazily so that a trailing
/// lowercase `i`/`d` is claimed by the direction suffix, not the qualifier.
static LRS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<sr>[0-9]{3})(?:(?P<rrt>(?i:AR|CO|F[ST]|PR|RL|SP|TB|TR|LX|[CFH][DI]|[PQRS][1-9]|UC))(?P<rrq>[0-9A-Za-z]{0,6}?))?(?P<dir>[id]?)$",
    )
    .expect("route id grammar is valid")
});

/// Label-form grammar: `I-5`, `US-101`, `SR 8`.
static LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z]+[-\s](?P<num>[0-9]{0,3})$").expect("label grammar is valid"));

/// Travel direction parsed from (or rendered into) a route id suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Direction {
    /// No explicit suffix; rendering falls back to increasing when the
    /// policy requires a suffix.
    #[default]
    Unset,
    Increasing,
    Decreasing,
}

/// Controls whether and which direction suffix is appended when rendering a
/// [`RouteId`] back to its canonical string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SuffixPolicy {
    /// Bare mainline + RRT + RRQ, no suffix.
    None,
    /// Always an `i` suffix, even for explicitly decreasing ids.
    RequireIncreasing,
    /// A `d` suffix for explicitly decreasing ids, `i` for everything else.
    RequireDecreasing,
    /// A `d` suffix for explicitly decreasing ids, `i` for everything else.
    #[default]
    Either,
}

/// A canonical route identifier.
///
/// Invariants: `mainline` is exactly 3 ASCII digits; `rrq` is only present
/// when `rrt` is. Construct via [`RouteId::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RouteId {
    mainline: String,
    rrt: Option<String>,
    rrq: Option<String>,
    direction: Direction,
}

impl RouteId {
    /// Parse a raw route id string in either surface form.
    ///
    /// Returns [`LocateError::MalformedRouteId`] when neither grammar
    /// matches; the error is per-row and never retried.
    pub fn parse(raw: &str) -> Result<Self> {
        if let Some(caps) = LRS_RE.captures(raw) {
            return Ok(Self::from_lrs(&caps));
        }

        // A trailing uppercase I/D is a direction suffix only when the
        // grammar accepts nothing else in that position (see module docs).
        let lowered = raw
            .strip_suffix('I')
            .map(|prefix| format!("{prefix}i"))
            .or_else(|| raw.strip_suffix('D').map(|prefix| format!("{prefix}d")));
        if let Some(lowered) = lowered
            && let Some(caps) = LRS_RE.captures(&lowered)
        {
            return Ok(Self::from_lrs(&caps));
        }

        if let Some(caps) = LABEL_RE.captures(raw) {
            return Ok(RouteId {
                mainline: format!("{:0>3}", &caps["num"]),
                rrt: None,
                rrq: None,
                direction: Direction::Unset,
            });
        }

        Err(LocateError::MalformedRouteId(raw.to_string()))
    }

    fn from_lrs(caps: &Captures<'_>) -> Self {
        let rrt = caps.name("rrt").map(|m| m.as_str().to_ascii_uppercase());
        let rrq = caps
            .name("rrq")
            .map(|m| m.as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_ascii_uppercase);
        let direction = match caps.name("dir").map(|m| m.as_str()) {
            Some("i") => Direction::Increasing,
            Some("d") => Direction::Decreasing,
            _ => Direction::Unset,
        };
        RouteId {
            mainline: caps["sr"].to_string(),
            rrt,
            rrq,
            direction,
        }
    }

    /// The 3-digit mainline number.
    #[inline]
    pub fn mainline(&self) -> &str {
        &self.mainline
    }

    /// The 2-letter related route type, if any.
    #[inline]
    pub fn related_route_type(&self) -> Option<&str> {
        self.rrt.as_deref()
    }

    /// The related route qualifier; only present when an RRT is.
    #[inline]
    pub fn related_route_qualifier(&self) -> Option<&str> {
        self.rrq.as_deref()
    }

    #[inline]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// The bare mainline + RRT + RRQ string, no direction suffix.
    pub fn unsuffixed(&self) -> String {
        let mut out = self.mainline.clone();
        if let Some(rrt) = &self.rrt {
            out.push_str(rrt);
        }
        if let Some(rrq) = &self.rrq {
            out.push_str(rrq);
        }
        out
    }

    /// Render the canonical string under the given suffix policy.
    ///
    /// A `d` suffix is only ever emitted for an explicitly decreasing id
    /// under a policy that permits it; everything else that requires a
    /// suffix falls back to `i`. This asymmetry is the standardization
    /// convention the rest of the engine assumes.
    pub fn standardized(&self, policy: SuffixPolicy) -> String {
        let mut out = self.unsuffixed();
        match policy {
            SuffixPolicy::None => {}
            SuffixPolicy::RequireIncreasing => out.push('i'),
            SuffixPolicy::RequireDecreasing | SuffixPolicy::Either => {
                out.push(if self.direction == Direction::Decreasing {
                    'd'
                } else {
                    'i'
                });
            }
        }
        out
    }
}

impl fmt::Display for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.unsuffixed())
    }
}

/// Normalize a raw route id and render it under `policy` in one step.
///
/// This is the form the locating engine uses to build lookup keys.
pub fn standardize_route_id(raw: &str, policy: SuffixPolicy) -> Result<String> {
    Ok(RouteId::parse(raw)?.standardized(policy))
}

/// Merge an unsuffixed route id column with a separate free-text direction
/// column into one standardized id.
///
/// Any direction value starting with `d`/`D` means decreasing; anything
/// else, including an absent value, falls back to the policy's default
/// suffix. A suffix already present on `route_id` is ignored in favor of the
/// direction column.
pub fn standardize_with_direction(
    route_id: &str,
    direction: Option<&str>,
    policy: SuffixPolicy,
) -> Result<String> {
    let mut id = RouteId::parse(route_id)?;
    id.direction = if direction.is_some_and(|d| d.starts_with(['d', 'D'])) {
        Direction::Decreasing
    } else {
        Direction::Unset
    };
    Ok(id.standardized(policy))
}
