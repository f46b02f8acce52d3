//! Tests for the input-line state machine: completion splicing, lexical
//! selection extension, search, undo flavors and dynamic expansion.

use rcmd::{Action, InputState};

fn state_with(before: &str, after: &str) -> InputState {
    let mut state = InputState::new();
    state.before_cursor = before.to_string();
    state.after_cursor = after.to_string();
    state.reset_selection();
    state
}

fn selection_len(state: &InputState) -> usize {
    let (start, end) = state.selection_range();
    end - start
}

#[test]
fn basic_completion() {
    let mut state = state_with("C:\\", "");
    state.handle(Action::Complete("C:\\Windows".to_string()));
    assert_eq!(state.before_cursor, "C:\\Windows");
    assert_eq!(state.after_cursor, "");
}

#[test]
fn completion_avoids_duplicate_fillers() {
    let mut state = state_with("\"c:\\Program Files (x86)\\Sysinternals Suite", "\"\\");
    state.handle(Action::Complete(
        "\"c:\\Program Files (x86)\\Sysinternals Suite\"\\".to_string(),
    ));
    assert_eq!(
        state.before_cursor,
        "\"c:\\Program Files (x86)\\Sysinternals Suite\"\\"
    );
    assert_eq!(state.after_cursor, "");
}

#[test]
fn extend_selection_walks_out_to_the_whole_line() {
    let mut state = state_with("cd d:\\Work\\bui", "ld && make");

    state.handle(Action::SelectUp);
    assert_eq!(state.before_cursor, "cd d:\\Work\\");
    assert_eq!(state.after_cursor, "build && make");
    assert_eq!(state.selection_start, state.before_cursor.len() + "build".len());

    state.handle(Action::SelectUp);
    assert_eq!(state.before_cursor, "cd ");
    assert_eq!(state.after_cursor, "d:\\Work\\build && make");
    assert_eq!(
        state.selection_start,
        state.before_cursor.len() + "d:\\Work\\build".len()
    );

    state.handle(Action::SelectUp);
    assert_eq!(state.before_cursor, "");
    assert_eq!(state.after_cursor, "cd d:\\Work\\build && make");
    assert_eq!(
        state.selection_start,
        state.before_cursor.len() + "cd d:\\Work\\build ".len()
    );

    state.handle(Action::SelectUp);
    assert_eq!(state.before_cursor, "");
    assert_eq!(state.after_cursor, "cd d:\\Work\\build && make");
    assert_eq!(state.selection_start, state.after_cursor.len());
}

#[test]
fn extend_selection_across_sequencing_tokens() {
    let mut state = state_with("cd test && mak", "e clean > NUL");

    state.handle(Action::SelectUp);
    assert_eq!(state.before_cursor, "cd test && ");
    assert_eq!(state.after_cursor, "make clean > NUL");
    assert_eq!(state.selection_start, state.before_cursor.len() + "make".len());

    state.handle(Action::SelectUp);
    assert_eq!(state.before_cursor, "cd test &&");
    assert_eq!(state.after_cursor, " make clean > NUL");
    assert_eq!(
        state.selection_start,
        state.before_cursor.len() + " make clean ".len()
    );

    state.handle(Action::SelectUp);
    assert_eq!(state.before_cursor, "cd test &&");
    assert_eq!(state.after_cursor, " make clean > NUL");
    assert_eq!(
        state.selection_start,
        state.before_cursor.len() + " make clean > NUL".len()
    );

    state.handle(Action::SelectUp);
    assert_eq!(state.before_cursor, "");
    assert_eq!(state.after_cursor, "cd test && make clean > NUL");
    assert_eq!(state.selection_start, state.after_cursor.len());
}

#[test]
fn extend_selection_through_dashed_names() {
    let mut state = state_with("python runner.py -i dev-in", "it.py");

    state.handle(Action::SelectUp);
    assert_eq!(state.before_cursor, "python runner.py -i dev-");
    assert_eq!(state.after_cursor, "init.py");
    assert_eq!(state.selection_start, state.before_cursor.len() + "init".len());

    state.handle(Action::SelectUp);
    assert_eq!(state.before_cursor, "python runner.py -i ");
    assert_eq!(state.after_cursor, "dev-init.py");
    assert_eq!(
        state.selection_start,
        state.before_cursor.len() + "dev-init".len()
    );

    state.handle(Action::SelectUp);
    assert_eq!(state.before_cursor, "python runner.py -i ");
    assert_eq!(state.after_cursor, "dev-init.py");
    assert_eq!(
        state.selection_start,
        state.before_cursor.len() + "dev-init.py".len()
    );

    state.handle(Action::SelectUp);
    assert_eq!(state.before_cursor, "");
    assert_eq!(state.after_cursor, "python runner.py -i dev-init.py");
    assert_eq!(state.selection_start, state.after_cursor.len());
}

#[test]
fn extend_selection_inside_quotes() {
    let mut state = state_with("cd \"c:\\Program Files (x86)\\Sysinter", "nals Suite\" && ls -l");

    state.handle(Action::SelectUp);
    assert_eq!(state.before_cursor, "cd \"c:\\Program Files (x86)\\");
    assert_eq!(state.after_cursor, "Sysinternals Suite\" && ls -l");
    assert_eq!(
        state.selection_start,
        state.before_cursor.len() + "Sysinternals".len()
    );

    state.handle(Action::SelectUp);
    assert_eq!(state.before_cursor, "cd \"c:\\Program Files (x86)\\");
    assert_eq!(state.after_cursor, "Sysinternals Suite\" && ls -l");
    assert_eq!(
        state.selection_start,
        state.before_cursor.len() + "Sysinternals Suite".len()
    );

    state.handle(Action::SelectUp);
    assert_eq!(state.before_cursor, "cd \"");
    assert_eq!(state.after_cursor, "c:\\Program Files (x86)\\Sysinternals Suite\" && ls -l");
    assert_eq!(
        state.selection_start,
        state.before_cursor.len() + "c:\\Program Files (x86)\\Sysinternals Suite".len()
    );

    state.handle(Action::SelectUp);
    assert_eq!(state.before_cursor, "cd ");
    assert_eq!(
        state.after_cursor,
        "\"c:\\Program Files (x86)\\Sysinternals Suite\" && ls -l"
    );
    assert_eq!(
        state.selection_start,
        state.before_cursor.len() + "\"c:\\Program Files (x86)\\Sysinternals Suite\"".len()
    );

    state.handle(Action::SelectUp);
    assert_eq!(state.before_cursor, "");
    assert_eq!(
        state.after_cursor,
        "cd \"c:\\Program Files (x86)\\Sysinternals Suite\" && ls -l"
    );
    assert_eq!(
        state.selection_start,
        "cd \"c:\\Program Files (x86)\\Sysinternals Suite\" ".len()
    );

    state.handle(Action::SelectUp);
    assert_eq!(state.selection_start, state.after_cursor.len());
}

#[test]
fn extend_selection_in_quoted_dashed_name() {
    let mut state = state_with("\"d:\\Util\\KDE Mo", "ver-Sizer.exe\"");

    state.handle(Action::SelectUp);
    assert_eq!(state.before_cursor, "\"d:\\Util\\KDE ");
    assert_eq!(state.after_cursor, "Mover-Sizer.exe\"");
    assert_eq!(state.selection_start, state.before_cursor.len() + "Mover".len());

    state.handle(Action::SelectUp);
    assert_eq!(
        state.selection_start,
        state.before_cursor.len() + "Mover-Sizer".len()
    );

    state.handle(Action::SelectUp);
    assert_eq!(state.before_cursor, "\"d:\\Util\\");
    assert_eq!(state.after_cursor, "KDE Mover-Sizer.exe\"");
    assert_eq!(
        state.selection_start,
        state.before_cursor.len() + "KDE Mover-Sizer".len()
    );

    state.handle(Action::SelectUp);
    assert_eq!(
        state.selection_start,
        state.before_cursor.len() + "KDE Mover-Sizer.exe".len()
    );

    state.handle(Action::SelectUp);
    assert_eq!(state.before_cursor, "\"");
    assert_eq!(state.after_cursor, "d:\\Util\\KDE Mover-Sizer.exe\"");
    assert_eq!(
        state.selection_start,
        state.before_cursor.len() + "d:\\Util\\KDE Mover-Sizer.exe".len()
    );

    state.handle(Action::SelectUp);
    assert_eq!(state.before_cursor, "");
    assert_eq!(state.after_cursor, "\"d:\\Util\\KDE Mover-Sizer.exe\"");
    assert_eq!(state.selection_start, state.after_cursor.len());
}

#[test]
fn extend_selection_at_end_of_line() {
    let mut state = state_with("ls \"c:\\Program Files (x86)\\scenview.py\" ", "");

    state.handle(Action::SelectUp);
    assert_eq!(state.before_cursor, "ls \"c:\\Program Files (x86)\\scenview.");
    assert_eq!(state.after_cursor, "py\" ");
    assert_eq!(state.selection_start, state.before_cursor.len() + "py".len());

    state.handle(Action::SelectUp);
    assert_eq!(state.before_cursor, "ls \"c:\\Program Files (x86)\\");
    assert_eq!(state.after_cursor, "scenview.py\" ");
    assert_eq!(
        state.selection_start,
        state.before_cursor.len() + "scenview.py".len()
    );

    state.handle(Action::SelectUp);
    assert_eq!(state.before_cursor, "ls \"");
    assert_eq!(
        state.selection_start,
        state.before_cursor.len() + "c:\\Program Files (x86)\\scenview.py".len()
    );

    state.handle(Action::SelectUp);
    assert_eq!(state.before_cursor, "ls ");
    assert_eq!(
        state.selection_start,
        state.before_cursor.len() + "\"c:\\Program Files (x86)\\scenview.py\"".len()
    );

    state.handle(Action::SelectUp);
    assert_eq!(state.before_cursor, "");
    assert_eq!(state.after_cursor, "ls \"c:\\Program Files (x86)\\scenview.py\" ");
    assert_eq!(state.selection_start, state.after_cursor.len());
}

#[test]
fn shrink_selection_reverses_each_extension_step() {
    let mut state = state_with("cd foo", "");
    let before = state.before_cursor.clone();
    let after = state.after_cursor.clone();
    let selection_start = state.selection_start;

    state.handle(Action::SelectUp);
    assert_ne!(selection_len(&state), 0);
    state.handle(Action::SelectDown);

    assert_eq!(state.before_cursor, before);
    assert_eq!(state.after_cursor, after);
    assert_eq!(state.selection_start, selection_start);
    assert_eq!(selection_len(&state), 0);
}

#[test]
fn shrink_with_no_extension_rings_the_bell() {
    let mut state = state_with("cd foo", "");
    state.handle(Action::SelectDown);
    assert!(state.bell);
}

#[test]
fn dynamic_expansion_cycles_through_candidates() {
    let mut state = state_with("git c", "");
    state.history.add("git commit -m fix");
    state.history.add("git checkout master");

    state.handle(Action::Expand);
    assert_eq!(state.before_cursor, "git checkout");
    state.handle(Action::Expand);
    assert_eq!(state.before_cursor, "git commit");
    state.handle(Action::Expand);
    assert_eq!(state.before_cursor, "git c");
}

#[test]
fn expansion_prefers_candidates_with_matching_context() {
    let mut state = state_with("run c", "");
    state.history.add("make clean");
    state.history.add("run cycle");

    // "cycle" follows the context word "run", so it beats the newer-ranked
    // plain match.
    state.handle(Action::Expand);
    assert_eq!(state.before_cursor, "run cycle");
    state.handle(Action::Expand);
    assert_eq!(state.before_cursor, "run clean");
}

#[test]
fn expansion_state_is_dropped_by_unrelated_actions() {
    let mut state = state_with("git c", "");
    state.history.add("git checkout master");

    state.handle(Action::Expand);
    assert_eq!(state.before_cursor, "git checkout");
    state.handle(Action::Left { select: false });
    state.handle(Action::Right { select: false });
    // A fresh expansion starts from the new stub, not the stale candidates.
    state.handle(Action::Expand);
    assert_eq!(state.before_cursor, "git checkout");
}

#[test]
fn undo_then_redo_is_an_identity() {
    let mut state = state_with("", "");
    state.handle(Action::Insert("make".to_string()));
    state.handle(Action::Delete);
    state.handle(Action::Insert(" test".to_string()));
    let before = state.before_cursor.clone();
    let after = state.after_cursor.clone();

    state.handle(Action::Undo);
    assert_eq!(state.before_cursor, "make");
    state.handle(Action::Redo);
    assert_eq!(state.before_cursor, before);
    assert_eq!(state.after_cursor, after);
}

#[test]
fn word_deletes_form_their_own_undo_groups() {
    let mut state = state_with("", "");
    state.handle(Action::Insert("cargo build --release".to_string()));
    state.handle(Action::BackspaceWord);
    assert_eq!(state.before_cursor, "cargo build --");

    state.handle(Action::Undo);
    assert_eq!(state.before_cursor, "cargo build --release");
    state.handle(Action::Undo);
    assert_eq!(state.before_cursor, "");
}

#[test]
fn emacs_undo_walks_back_through_states() {
    let mut state = state_with("", "");
    state.handle(Action::Insert("one".to_string()));
    state.handle(Action::Delete); // no-op, changes nothing
    state.handle(Action::Insert(" two".to_string()));

    state.handle(Action::UndoEmacs);
    assert_eq!(state.line(), "one");
    state.handle(Action::UndoEmacs);
    assert_eq!(state.line(), "");
}

#[test]
fn both_undo_flavors_can_alternate_without_losing_state() {
    let mut state = state_with("", "");
    state.handle(Action::Insert("alpha".to_string()));
    state.handle(Action::KillEol); // batch action, new group
    state.handle(Action::Insert(" beta".to_string()));

    state.handle(Action::Undo);
    assert_eq!(state.line(), "alpha");
    state.handle(Action::UndoEmacs);
    // The Emacs stack recorded the state the classic undo restored.
    assert_eq!(state.line(), "alpha beta");
    state.handle(Action::UndoEmacs);
    assert_eq!(state.line(), "alpha");
}

#[test]
fn incremental_search_selects_matches_rightward() {
    let mut state = state_with("", "find the finder");
    state.handle(Action::Home { select: false });

    state.handle(Action::SearchRight);
    state.handle(Action::Insert("f".to_string()));
    assert_eq!(state.before_cursor, "f");
    state.handle(Action::Insert("i".to_string()));
    assert_eq!(state.before_cursor, "fi");

    // Advancing jumps to the next occurrence and selects it.
    state.handle(Action::SearchRight);
    assert_eq!(state.before_cursor, "find the fi");
    assert_eq!(state.selection(), "fi");
}

#[test]
fn search_with_no_match_rings_the_bell() {
    let mut state = state_with("", "abc");
    state.handle(Action::SearchRight);
    state.handle(Action::Insert("z".to_string()));
    assert!(state.bell);
}

#[test]
fn search_on_an_empty_line_rings_the_bell() {
    let mut state = state_with("", "   ");
    state.handle(Action::SearchRight);
    assert!(state.bell);
    assert!(state.search_substr.is_none());
}

#[test]
fn escape_clears_selection_then_filter_then_line() {
    let mut state = state_with("cd foo", "");
    state.handle(Action::SelectUp);
    assert_ne!(selection_len(&state), 0);

    state.handle(Action::Escape);
    assert_eq!(selection_len(&state), 0);
    assert_eq!(state.line(), "cd foo");

    state.handle(Action::Escape);
    assert_eq!(state.line(), "");
    assert_eq!(state.history.list.last().map(String::as_str), Some("cd foo"));
}

#[test]
fn history_navigation_replaces_the_line() {
    let mut state = state_with("", "");
    state.history.add("ls -la");
    state.history.add("make check");

    state.handle(Action::Prev);
    assert_eq!(state.line(), "make check");
    state.handle(Action::Prev);
    assert_eq!(state.line(), "ls -la");
    state.handle(Action::Next);
    assert_eq!(state.line(), "make check");
    state.handle(Action::Next);
    assert_eq!(state.line(), "");
}

#[test]
fn navigation_exhaustion_rings_the_bell() {
    let mut state = state_with("", "");
    state.history.add("only entry");
    state.handle(Action::Prev);
    state.handle(Action::Prev);
    assert!(state.bell);
}

#[test]
fn overwrite_mode_consumes_characters_after_the_cursor() {
    let mut state = state_with("", "abcdef");
    state.handle(Action::ToggleOverwrite);
    assert!(state.overwrite);
    state.handle(Action::Insert("XY".to_string()));
    assert_eq!(state.before_cursor, "XY");
    assert_eq!(state.after_cursor, "cdef");
}

#[test]
fn cut_copy_paste_use_the_internal_clipboard() {
    let mut state = state_with("hello world", "");
    state.handle(Action::Home { select: false });
    state.handle(Action::RightWord { select: true });
    assert_eq!(state.selection(), "hello");

    state.handle(Action::Cut);
    assert_eq!(state.line(), " world");

    state.handle(Action::End { select: false });
    state.handle(Action::Paste);
    assert_eq!(state.line(), " worldhello");
}

#[test]
fn line_length_is_conserved_by_editing() {
    let mut state = state_with("", "");
    state.handle(Action::Insert("abcdef".to_string()));
    state.handle(Action::Left { select: false });
    state.handle(Action::Left { select: false });
    state.handle(Action::Backspace);
    state.handle(Action::Delete);
    state.handle(Action::Insert("XY".to_string()));
    // 6 typed - 2 deleted + 2 inserted
    assert_eq!(state.line().chars().count(), 6);
}
