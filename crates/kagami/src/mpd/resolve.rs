use std::path::Path;

use dash_mpd::{AdaptationSet, Representation, SegmentList, SegmentTemplate, MPD};
use url::Url;

use crate::{
    error::{KagamiError, KagamiResult},
    registry::ItemRegistry,
};

use super::{
    base::{merge_baseurls, resolve_hierarchy, ResolvedPath},
    template::Template,
};

/// Optional allow-lists restricting which representations are mirrored. An
/// empty list is no constraint, not "reject all".
#[derive(Debug, Default, Clone)]
pub struct SegmentFilter {
    pub representation_ids: Vec<String>,
    pub mime_prefixes: Vec<String>,
}

impl SegmentFilter {
    pub fn matches(&self, representation: &Representation, adaptation_set: &AdaptationSet) -> bool {
        if !self.representation_ids.is_empty() {
            let id = representation.id.as_deref().unwrap_or_default();
            if !self.representation_ids.iter().any(|allowed| allowed == id) {
                return false;
            }
        }

        if !self.mime_prefixes.is_empty() {
            // A representation without its own mimeType inherits the one
            // declared on its adaptation set.
            let mime = representation
                .mimeType
                .as_deref()
                .or(adaptation_set.mimeType.as_deref())
                .unwrap_or_default()
                .to_ascii_lowercase();
            if !self
                .mime_prefixes
                .iter()
                .any(|prefix| mime.starts_with(&prefix.to_ascii_lowercase()))
            {
                return false;
            }
        }

        true
    }
}

#[derive(Debug, Default, Clone)]
pub struct ResolveOptions {
    pub filter: SegmentFilter,
    /// Total segment count for `$Number$`-based templates without a timeline.
    /// The manifest text does not carry this, so it has to come from outside;
    /// resolving such a template without it is a fatal error.
    pub segment_count: Option<u64>,
}

/// Expands every selected representation into concrete item URLs. Any error
/// here aborts the whole run: a partially resolved item list is never handed
/// to the downloader.
pub fn resolve_items(
    mpd: &MPD,
    manifest_url: &Url,
    options: &ResolveOptions,
) -> KagamiResult<ItemRegistry> {
    let mut registry = ItemRegistry::new();
    for path in resolve_hierarchy(mpd, manifest_url)? {
        if !options.filter.matches(path.representation, path.adaptation_set) {
            continue;
        }
        resolve_representation(&path, options, &mut registry)?;
    }
    Ok(registry)
}

/// Exactly one addressing mode applies per (representation, effective base):
/// an explicit SegmentList wins over a SegmentTemplate, and with neither
/// declared the base itself is the whole file if its path looks like one.
/// List and template elements on the representation take precedence over the
/// adaptation set's.
fn resolve_representation(
    path: &ResolvedPath,
    options: &ResolveOptions,
    registry: &mut ItemRegistry,
) -> KagamiResult<()> {
    let representation = path.representation;
    let adaptation_set = path.adaptation_set;
    let base_url = &path.base_url;

    if let Some(segment_list) = representation
        .SegmentList
        .as_ref()
        .or(adaptation_set.SegmentList.as_ref())
    {
        resolve_segment_list(segment_list, base_url, registry)
    } else if let Some(segment_template) = representation
        .SegmentTemplate
        .as_ref()
        .or(adaptation_set.SegmentTemplate.as_ref())
    {
        resolve_segment_template(segment_template, representation, base_url, options, registry)
    } else {
        if Path::new(base_url.path()).extension().is_some() {
            registry.register(base_url.clone());
        }
        Ok(())
    }
}

fn resolve_segment_list(
    segment_list: &SegmentList,
    base_url: &Url,
    registry: &mut ItemRegistry,
) -> KagamiResult<()> {
    if let Some(initialization) = &segment_list.Initialization {
        if let Some(source_url) = &initialization.sourceURL {
            registry.register(merge_baseurls(base_url, source_url)?);
        }
    }
    for segment_url in &segment_list.segment_urls {
        if let Some(media) = &segment_url.media {
            registry.register(merge_baseurls(base_url, media)?);
        }
    }
    Ok(())
}

fn resolve_segment_template(
    segment_template: &SegmentTemplate,
    representation: &Representation,
    base_url: &Url,
    options: &ResolveOptions,
    registry: &mut ItemRegistry,
) -> KagamiResult<()> {
    let mut template = Template::new();
    if let Some(id) = &representation.id {
        template.insert(Template::REPRESENTATION_ID, id.clone());
    }
    if let Some(bandwidth) = representation.bandwidth {
        template.insert(Template::BANDWIDTH, bandwidth.to_string());
    }

    // Initialization patterns only ever carry $RepresentationID$ and
    // $Bandwidth$; numeric and timing identifiers do not apply to them.
    if let Some(initialization) = &segment_template.initialization {
        registry.register(merge_baseurls(base_url, &template.resolve(initialization))?);
    }

    let Some(media) = &segment_template.media else {
        return Ok(());
    };

    if let Some(timeline) = &segment_template.SegmentTimeline {
        if Template::references(media, Template::NUMBER) {
            return Err(KagamiError::MissingTemplateValue {
                variable: Template::NUMBER,
                template: media.clone(),
            });
        }

        // Running cursor over the declared runs: each S emits r + 1 segments
        // of duration d, advancing the cursor after every emission. An S with
        // its own @t overrides the cursor instead of accumulating.
        let mut current_time = timeline.segments.first().and_then(|s| s.t).unwrap_or(0);
        for segment in &timeline.segments {
            if let Some(t) = segment.t {
                current_time = t;
            }
            // r = -1 ("repeat until the end") only makes sense for live.
            let repeat = segment.r.unwrap_or(0).max(0) as u64;
            for _ in 0..=repeat {
                template.insert(Template::TIME, current_time.to_string());
                registry.register(merge_baseurls(base_url, &template.resolve(media))?);
                current_time += segment.d;
            }
        }
    } else {
        if Template::references(media, Template::TIME) {
            return Err(KagamiError::MissingTemplateValue {
                variable: Template::TIME,
                template: media.clone(),
            });
        }

        let count = options.segment_count.ok_or_else(|| {
            KagamiError::MissingSegmentCount(representation.id.clone().unwrap_or_default())
        })?;
        let start_number = segment_template.startNumber.unwrap_or(1);
        for number in start_number..start_number + count {
            template.insert(Template::NUMBER, number.to_string());
            registry.register(merge_baseurls(base_url, &template.resolve(media))?);
        }
    }

    Ok(())
}
