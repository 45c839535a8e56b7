//! Master playlist scanner

use super::{AttributeList, PlaylistParser, STREAM_INF_TAG};
use crate::types::{Resolution, Variant};
use std::collections::HashSet;
use tracing::debug;

pub(super) fn parse(text: &str, parser: &PlaylistParser) -> Vec<Variant> {
    let mut variants: Vec<Variant> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut pending: Option<AttributeList> = None;

    for line in text.lines().map(str::trim) {
        if line.is_empty() {
            continue;
        }

        if let Some(rest) = line.strip_prefix(STREAM_INF_TAG) {
            if pending.is_some() {
                debug!("Stream entry without a playlist reference dropped");
            }
            pending = Some(AttributeList::parse(rest));
            continue;
        }

        if line.starts_with('#') {
            continue;
        }

        let Some(attrs) = pending.take() else {
            continue;
        };

        let playlist_ref = parser.resolve(line);
        if !seen.insert(playlist_ref.clone()) {
            debug!(playlist_ref = %playlist_ref, "Duplicate variant ignored");
            continue;
        }

        variants.push(variant_from_attributes(playlist_ref, &attrs));
    }

    if variants.is_empty() {
        return Vec::new();
    }

    let auto = Variant::auto(parser.master_ref());
    variants.retain(|v| !v.same_stream(&auto));
    // Stable sort keeps playlist order between equal scores
    variants.sort_by(|a, b| a.mobile_score.total_cmp(&b.mobile_score));

    debug!(variants = variants.len(), "Master playlist parsed");

    let mut ranked = Vec::with_capacity(variants.len() + 1);
    ranked.push(auto);
    ranked.extend(variants);
    ranked
}

fn variant_from_attributes(playlist_ref: String, attrs: &AttributeList) -> Variant {
    Variant::new(
        playlist_ref,
        attrs.get_u64("BANDWIDTH").unwrap_or(0),
        attrs.get("RESOLUTION").and_then(Resolution::parse),
        attrs.get_f64("FRAME-RATE"),
        attrs.get("CODECS").map(str::to_string),
    )
}

#[cfg(test)]
mod tests {
    use crate::playlist::PlaylistParser;
    use crate::types::{Resolution, AUTO_LABEL};

    const TWO_VARIANTS: &str = "#EXTM3U
#EXT-X-VERSION:3
#EXT-X-STREAM-INF:BANDWIDTH=1500000,RESOLUTION=1280x720
index_0.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=500000,RESOLUTION=640x360
index_1.m3u8
";

    #[test]
    fn test_auto_first_then_mobile_score() {
        let parser = PlaylistParser::new().with_master_ref("master.m3u8");
        let variants = parser.parse_master(TWO_VARIANTS);

        assert_eq!(variants.len(), 3);
        assert_eq!(variants[0].quality_label, AUTO_LABEL);
        assert_eq!(variants[0].playlist_ref, "master.m3u8");
        assert_eq!(variants[1].quality_label, "360p");
        assert_eq!(variants[1].playlist_ref, "index_1.m3u8");
        assert_eq!(variants[2].quality_label, "720p");
        assert_eq!(variants[2].resolution, Some(Resolution::new(1280, 720)));
    }

    #[test]
    fn test_no_stream_inf_yields_empty() {
        let parser = PlaylistParser::new();
        assert!(parser.parse_master("#EXTM3U\n#EXTINF:4,\nseg.ts\n").is_empty());
        assert!(parser.parse_master("").is_empty());
    }

    #[test]
    fn test_missing_attributes() {
        let text = "#EXTM3U\n#EXT-X-STREAM-INF:CODECS=\"avc1.42e01e,mp4a.40.2\"\nlow.m3u8\n\
                    #EXT-X-STREAM-INF:BANDWIDTH=2400000\nhigh.m3u8\n";
        let variants = PlaylistParser::new().parse_master(text);

        assert_eq!(variants.len(), 3);
        assert_eq!(variants[1].bandwidth_bps, 0);
        assert_eq!(variants[1].quality_label, "0kbps");
        assert_eq!(variants[1].codecs.as_deref(), Some("avc1.42e01e,mp4a.40.2"));
        assert_eq!(variants[2].quality_label, "2Mbps");
    }

    #[test]
    fn test_mangled_attribute_lists_keep_bandwidth() {
        let text = "#EXTM3U
#EXT-X-STREAM-INF:BANDWIDTH=1500000 RESOLUTION=1280x720
high.m3u8
#EXT-X-STREAM-INF:AVERAGE BANDWIDTH=1,BANDWIDTH=900000,RESOLUTION=854x480
mid.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=500000,RESOLUTION=640x360
low.m3u8
";
        let variants = PlaylistParser::new().parse_master(text);

        assert_eq!(variants.len(), 4);
        assert_eq!(variants[1].playlist_ref, "low.m3u8");

        let high = variants.iter().find(|v| v.playlist_ref == "high.m3u8").unwrap();
        assert_eq!(high.bandwidth_bps, 1_500_000);
        assert_eq!(high.quality_label, "720p");

        let mid = variants.iter().find(|v| v.playlist_ref == "mid.m3u8").unwrap();
        assert_eq!(mid.bandwidth_bps, 900_000);
        assert_eq!(mid.resolution, Some(Resolution::new(854, 480)));
    }

    #[test]
    fn test_comments_between_tag_and_uri() {
        let text = "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=700000,RESOLUTION=854x480\n\n# note\nmid.m3u8\n";
        let variants = PlaylistParser::new().parse_master(text);
        assert_eq!(variants.len(), 2);
        assert_eq!(variants[1].playlist_ref, "mid.m3u8");
    }

    #[test]
    fn test_duplicate_refs_collapse() {
        let text = "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=500000\nsame.m3u8\n\
                    #EXT-X-STREAM-INF:BANDWIDTH=900000\nsame.m3u8\n";
        let variants = PlaylistParser::new().parse_master(text);
        assert_eq!(variants.len(), 2);
        assert_eq!(variants[1].bandwidth_bps, 500_000);
    }

    #[test]
    fn test_frame_rate_penalty_orders_variants() {
        let text = "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=1000000,RESOLUTION=640x360,FRAME-RATE=60\nfast.m3u8\n\
                    #EXT-X-STREAM-INF:BANDWIDTH=1000000,RESOLUTION=640x360\nplain.m3u8\n";
        let variants = PlaylistParser::new().parse_master(text);
        assert_eq!(variants[1].playlist_ref, "plain.m3u8");
        assert_eq!(variants[2].playlist_ref, "fast.m3u8");
        assert_eq!(variants[2].frame_rate, 60.0);
    }

    #[test]
    fn test_parse_twice_is_identical() {
        let parser = PlaylistParser::new().with_base_path("https://api.example.com/playlist/ios/1");
        assert_eq!(parser.parse_master(TWO_VARIANTS), parser.parse_master(TWO_VARIANTS));
    }
}
