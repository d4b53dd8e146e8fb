use proptest::prelude::*;
use reelkit_project_model::{Project, ScenePatch};

#[derive(Debug, Clone)]
enum Edit {
    Add(Option<usize>),
    Remove(usize),
    Resize(usize, u64),
}

fn edit_strategy() -> impl Strategy<Value = Edit> {
    prop_oneof![
        proptest::option::of(0usize..8).prop_map(Edit::Add),
        (0usize..8).prop_map(Edit::Remove),
        (0usize..8, 1u64..400).prop_map(|(i, d)| Edit::Resize(i, d)),
    ]
}

proptest! {
    #[test]
    fn edits_keep_timeline_contiguous(edits in proptest::collection::vec(edit_strategy(), 0..40)) {
        let mut project = Project::new("media-prop", "Props", 30);

        for edit in edits {
            match edit {
                Edit::Add(after) => {
                    project.add_scene(after);
                }
                Edit::Remove(i) => {
                    let id = project.scenes()[i % project.scenes().len()].id.clone();
                    project.remove_scene(&id);
                }
                Edit::Resize(i, frames) => {
                    let id = project.scenes()[i % project.scenes().len()].id.clone();
                    let patch = ScenePatch {
                        duration_in_frames: Some(frames),
                        ..Default::default()
                    };
                    project.update_scene(&id, patch).unwrap();
                }
            }

            prop_assert!(!project.scenes().is_empty());
            prop_assert!(project.validate().is_empty());

            let mut cursor = 0;
            for scene in project.scenes() {
                prop_assert_eq!(scene.start_frame, cursor);
                cursor = scene.end_frame();
            }
            prop_assert_eq!(project.total_frames(), cursor);
        }
    }
}

#[test]
fn insertion_after_last_scene_starts_at_its_end() {
    let mut project = Project::new("media-1", "Contiguity", 30);
    project
        .update_scene(
            "scene-1",
            ScenePatch {
                duration_in_frames: Some(137),
                ..Default::default()
            },
        )
        .unwrap();
    let end = project.scenes().last().unwrap().end_frame();

    let id = project.add_scene(None);
    assert_eq!(project.scene(&id).unwrap().start_frame, end);
}
