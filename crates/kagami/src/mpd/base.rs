use dash_mpd::{AdaptationSet, BaseURL, Representation, MPD};
use url::Url;

use crate::error::KagamiResult;

pub(crate) fn is_absolute_url(s: &str) -> bool {
    s.starts_with("http://")
        || s.starts_with("https://")
        || s.starts_with("file://")
        || s.starts_with("ftp://")
}

/// Resolves a BaseURL text against its parent base. Absolute URLs replace the
/// base entirely; relative ones merge path segments. The parent's query string
/// (e.g. a signed-URL token on the manifest) is carried over unless the joined
/// result brings its own.
pub(crate) fn merge_baseurls(current: &Url, new: &str) -> KagamiResult<Url> {
    if is_absolute_url(new) {
        Ok(Url::parse(new)?)
    } else {
        let mut merged = current.join(new)?;
        if merged.query().is_none() {
            merged.set_query(current.query());
        }
        Ok(merged)
    }
}

/// One representation reachable through the override hierarchy, paired with a
/// single effective base URL. A representation shows up once per combination
/// of declared bases along its ancestor chain; multiple bases model mirrored
/// delivery paths, not an error.
pub struct ResolvedPath<'a> {
    pub representation: &'a Representation,
    pub adaptation_set: &'a AdaptationSet,
    pub base_url: Url,
}

/// A BaseURL text of `""` or exactly `"/"` would silently reset resolution to
/// the host root, discarding everything above it. Treat those as undeclared.
fn clean_base_text(text: &str) -> Option<&str> {
    let text = text.trim();
    (!text.is_empty() && text != "/").then_some(text)
}

/// Cartesian product of the parent's effective bases and this level's
/// meaningful overrides. A level without any meaningful override passes the
/// parent bases through unchanged.
fn expand_level(parents: &[Url], bases: &[BaseURL]) -> KagamiResult<Vec<Url>> {
    let overrides: Vec<&str> = bases
        .iter()
        .filter_map(|base| clean_base_text(&base.base))
        .collect();
    if overrides.is_empty() {
        return Ok(parents.to_vec());
    }

    let mut out = Vec::with_capacity(parents.len() * overrides.len());
    for parent in parents {
        for base in &overrides {
            out.push(merge_baseurls(parent, base)?);
        }
    }
    Ok(out)
}

/// Walks MPD → Period → AdaptationSet → Representation and yields every
/// `(representation, adaptation set, effective base)` triple. Pure over the
/// parsed tree; the combinatorics live entirely in [`expand_level`].
pub fn resolve_hierarchy<'a>(
    mpd: &'a MPD,
    manifest_url: &Url,
) -> KagamiResult<Vec<ResolvedPath<'a>>> {
    let mut out = Vec::new();
    let mpd_bases = expand_level(std::slice::from_ref(manifest_url), &mpd.base_url)?;
    for period in &mpd.periods {
        let period_bases = expand_level(&mpd_bases, &period.BaseURL)?;
        for adaptation_set in &period.adaptations {
            let set_bases = expand_level(&period_bases, &adaptation_set.BaseURL)?;
            for representation in &adaptation_set.representations {
                for base_url in expand_level(&set_bases, &representation.BaseURL)? {
                    out.push(ResolvedPath {
                        representation,
                        adaptation_set,
                        base_url,
                    });
                }
            }
        }
    }
    Ok(out)
}
