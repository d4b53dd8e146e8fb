use proptest::prelude::*;
use reelkit_captions::{format_srt, parse_srt, CaptionCue};

fn cue_strategy() -> impl Strategy<Value = (u64, u64, String)> {
    (0u64..3_600_000, 0u64..60_000, "[a-zA-Z][a-zA-Z ,!?]{0,30}")
}

proptest! {
    #[test]
    fn parser_never_panics(input in "\\PC{0,400}") {
        let cues = parse_srt(&input);
        for cue in &cues {
            prop_assert!(cue.end_seconds >= cue.start_seconds);
        }
    }

    #[test]
    fn garbage_blocks_do_not_hide_valid_cues(
        raw in proptest::collection::vec(cue_strategy(), 1..12),
        garbage in "[a-z:>-]{1,20}",
    ) {
        let cues: Vec<CaptionCue> = raw
            .iter()
            .enumerate()
            .map(|(i, (start_ms, len_ms, text))| CaptionCue {
                index: i + 1,
                start_seconds: *start_ms as f64 / 1000.0,
                end_seconds: (start_ms + len_ms) as f64 / 1000.0,
                text: text.trim().to_string(),
            })
            .filter(|cue| !cue.text.is_empty())
            .collect();

        let mut doc = String::new();
        for block in format_srt(&cues).split("\n\n").filter(|b| !b.is_empty()) {
            doc.push_str(block);
            doc.push_str("\n\n");
            doc.push_str(&garbage);
            doc.push_str("\n\n");
        }

        let parsed = parse_srt(&doc);
        prop_assert_eq!(parsed.len(), cues.len());
        for cue in &cues {
            prop_assert!(parsed.iter().any(|p| p.text == cue.text
                && p.start_seconds == cue.start_seconds
                && p.end_seconds == cue.end_seconds));
        }
    }
}
