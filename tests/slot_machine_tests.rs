use appointment_dm::grammar::{GrammarResolver, Lexicon};
use appointment_dm::kernel::event::{Entity, NluResult, Recognition};
use appointment_dm::kernel::machine::{
    interpret, DialogueState, Interpretation, MachineEvent, Phase, RetryCause, SlotMachine, Stage,
};
use appointment_dm::kernel::scheduler::{self, EntryAction};
use appointment_dm::kernel::state::{SessionContext, SessionDelta, SlotValue};

const ALL_STAGES: [Stage; 5] = [Stage::Person, Stage::Day, Stage::FullDay, Stage::Time, Stage::Confirm];

fn heard(ctx: &SessionContext, utterance: &str) -> SessionContext {
    let mut ctx = ctx.clone();
    ctx.reduce(SessionDelta::RecordRecognition(Recognition::new(utterance)));
    ctx
}

fn listening(stage: Stage) -> DialogueState {
    DialogueState::collecting(stage, Phase::Listening)
}

#[test]
fn test_resolvable_utterance_advances_to_next_stage() {
    let machine = SlotMachine::default();
    let lexicon = Lexicon::builtin();
    let ctx = SessionContext::new(0.6, 0.6);

    let cases = [
        (Stage::Person, "vlad", Stage::Day),
        (Stage::Day, "monday", Stage::FullDay),
        (Stage::FullDay, "no", Stage::Time),
        (Stage::FullDay, "sure", Stage::Confirm),
        (Stage::Time, "10", Stage::Confirm),
    ];

    for (stage, utterance, expected) in cases {
        let step = machine
            .advance(listening(stage), MachineEvent::ListenCompleted, &heard(&ctx, utterance), &lexicon)
            .expect("listen completion is valid while listening");
        assert_eq!(step.state, DialogueState::collecting(expected, Phase::Prompt), "{stage:?} / {utterance}");
        assert!(step.context.last_recognition().is_none(), "recognition is consumed");
        assert!(matches!(step.entry, Some(EntryAction::Speak(_))));
    }
}

#[test]
fn test_unknown_utterance_retries_without_touching_slots() {
    let machine = SlotMachine::default();
    let lexicon = Lexicon::builtin();
    let mut ctx = SessionContext::new(0.6, 0.6);
    ctx.apply(SlotValue::Person("Victoria Daniilidou".into()));
    ctx.apply(SlotValue::Day("today".into()));

    for stage in ALL_STAGES {
        for utterance in ["bob", "the day after", ""] {
            assert!(!lexicon.is_known_utterance(utterance));
            let step = machine
                .advance(listening(stage), MachineEvent::ListenCompleted, &heard(&ctx, utterance), &lexicon)
                .unwrap();
            assert_eq!(step.state, DialogueState::collecting(stage, Phase::Retry(RetryCause::NotUnderstood)));
            assert_eq!(step.context.appointment(), ctx.appointment());
            assert_eq!(step.context.retries(stage), 1);
            assert_eq!(step.entry, Some(EntryAction::Speak(scheduler::NOT_UNDERSTOOD.to_string())));
        }
    }
}

#[test]
fn test_known_word_of_the_wrong_type_is_not_understood() {
    let machine = SlotMachine::default();
    let lexicon = Lexicon::builtin();
    let ctx = SessionContext::new(0.6, 0.6);

    // "monday" is in the grammar, but Person only asks the person resolver
    let step = machine
        .advance(listening(Stage::Person), MachineEvent::ListenCompleted, &heard(&ctx, "monday"), &lexicon)
        .unwrap();
    assert_eq!(step.state, DialogueState::collecting(Stage::Person, Phase::Retry(RetryCause::NotUnderstood)));
    assert!(step.context.appointment().person.is_none());
}

#[test]
fn test_no_input_retries_with_distinct_message() {
    let machine = SlotMachine::default();
    let lexicon = Lexicon::builtin();
    let ctx = SessionContext::new(0.6, 0.6);

    let step = machine
        .advance(listening(Stage::Person), MachineEvent::ListenCompleted, &ctx, &lexicon)
        .unwrap();
    assert_eq!(step.state, DialogueState::collecting(Stage::Person, Phase::Retry(RetryCause::NoInput)));
    assert_eq!(step.entry, Some(EntryAction::Speak("I did not hear you.".to_string())));

    let step = machine
        .advance(listening(Stage::Person), MachineEvent::ListenCompleted, &heard(&ctx, "bob"), &lexicon)
        .unwrap();
    assert_eq!(step.entry, Some(EntryAction::Speak("I can't hear you.".to_string())));
}

#[test]
fn test_retry_loops_back_to_prompt_and_success_clears_counter() {
    let machine = SlotMachine::default();
    let lexicon = Lexicon::builtin();
    let ctx = SessionContext::new(0.6, 0.6);

    let retry = machine
        .advance(listening(Stage::Day), MachineEvent::ListenCompleted, &ctx, &lexicon)
        .unwrap();
    let again = machine
        .advance(retry.state, MachineEvent::SpeechCompleted, &retry.context, &lexicon)
        .unwrap();
    assert_eq!(again.state, DialogueState::collecting(Stage::Day, Phase::Prompt));
    assert_eq!(again.entry, Some(EntryAction::Speak(scheduler::ASK_DAY.to_string())));
    assert_eq!(again.context.retries(Stage::Day), 1);

    let ok = machine
        .advance(listening(Stage::Day), MachineEvent::ListenCompleted, &heard(&again.context, "tuesday"), &lexicon)
        .unwrap();
    assert_eq!(ok.context.retries(Stage::Day), 0);
    assert_eq!(ok.context.appointment().day.as_deref(), Some("Tuesday"));
}

#[test]
fn test_full_day_yes_skips_time_and_omits_it_from_confirmation() {
    let machine = SlotMachine::default();
    let lexicon = Lexicon::builtin();
    let mut ctx = SessionContext::new(0.6, 0.6);
    ctx.apply(SlotValue::Person("Nayat Astaiza Soriano".into()));
    ctx.apply(SlotValue::Day("tomorrow".into()));

    let step = machine
        .advance(listening(Stage::FullDay), MachineEvent::ListenCompleted, &heard(&ctx, "yes"), &lexicon)
        .unwrap();
    assert_eq!(step.state, DialogueState::collecting(Stage::Confirm, Phase::Prompt));
    assert_eq!(step.context.appointment().full_day, Some(true));
    assert_eq!(
        step.entry,
        Some(EntryAction::Speak(
            "Do you want me to create an appointment with Nayat Astaiza Soriano on tomorrow for the whole day?"
                .to_string()
        ))
    );
}

#[test]
fn test_full_day_no_goes_through_time() {
    let machine = SlotMachine::default();
    let lexicon = Lexicon::builtin();
    let mut ctx = SessionContext::new(0.6, 0.6);
    ctx.apply(SlotValue::Person("Vladislav Maraev".into()));
    ctx.apply(SlotValue::Day("Monday".into()));

    let step = machine
        .advance(listening(Stage::FullDay), MachineEvent::ListenCompleted, &heard(&ctx, "nope"), &lexicon)
        .unwrap();
    assert_eq!(step.state, DialogueState::collecting(Stage::Time, Phase::Prompt));
    assert_eq!(step.context.appointment().full_day, Some(false));

    let step = machine
        .advance(listening(Stage::Time), MachineEvent::ListenCompleted, &heard(&step.context, "2 pm"), &lexicon)
        .unwrap();
    assert_eq!(
        step.entry,
        Some(EntryAction::Speak(
            "Do you want me to create an appointment with Vladislav Maraev on Monday at 14:00?".to_string()
        ))
    );
}

#[test]
fn test_decline_at_confirm_clears_everything_and_restarts_at_person() {
    let machine = SlotMachine::default();
    let lexicon = Lexicon::builtin();
    let mut ctx = SessionContext::new(0.6, 0.6);
    ctx.apply(SlotValue::Person("Vladislav Maraev".into()));
    ctx.apply(SlotValue::Day("Monday".into()));
    ctx.apply(SlotValue::FullDay(false));
    ctx.apply(SlotValue::Time("10:00".into()));

    let back = machine
        .advance(listening(Stage::Confirm), MachineEvent::ListenCompleted, &heard(&ctx, "no way"), &lexicon)
        .unwrap();
    assert_eq!(back.state, DialogueState::Back);
    assert!(back.context.appointment().is_empty());

    let restart = machine
        .advance(back.state, MachineEvent::SpeechCompleted, &back.context, &lexicon)
        .unwrap();
    assert_eq!(restart.state, DialogueState::collecting(Stage::Person, Phase::Prompt));
    assert_eq!(restart.entry, Some(EntryAction::Speak(scheduler::ASK_PERSON.to_string())));
}

#[test]
fn test_confirm_accept_goes_to_success_then_completed() {
    let machine = SlotMachine::default();
    let lexicon = Lexicon::builtin();
    let ctx = SessionContext::new(0.6, 0.6);

    let success = machine
        .advance(listening(Stage::Confirm), MachineEvent::ListenCompleted, &heard(&ctx, "absolutely"), &lexicon)
        .unwrap();
    assert_eq!(success.state, DialogueState::Success);
    assert_eq!(success.entry, Some(EntryAction::Speak(scheduler::CREATED.to_string())));

    let done = machine
        .advance(success.state, MachineEvent::SpeechCompleted, &success.context, &lexicon)
        .unwrap();
    assert_eq!(done.state, DialogueState::Completed);
    assert_eq!(done.entry, None);
}

#[test]
fn test_confirm_with_slot_word_retries() {
    let machine = SlotMachine::default();
    let lexicon = Lexicon::builtin();
    let ctx = SessionContext::new(0.6, 0.6);

    // Known to the grammar, but not a yes/no answer
    let step = machine
        .advance(listening(Stage::Confirm), MachineEvent::ListenCompleted, &heard(&ctx, "tuesday"), &lexicon)
        .unwrap();
    assert_eq!(step.state, DialogueState::collecting(Stage::Confirm, Phase::Retry(RetryCause::NotUnderstood)));
}

#[test]
fn test_ambiguous_token_is_read_as_the_active_stage_type() {
    let machine = SlotMachine::default();
    let lexicon = Lexicon::from_json_str(
        r#"{
            "entries": { "sure": { "day": "Saturday" } },
            "decisions": { "sure": "yes" }
        }"#,
    )
    .unwrap();
    let ctx = SessionContext::new(0.6, 0.6);

    let at_day = machine
        .advance(listening(Stage::Day), MachineEvent::ListenCompleted, &heard(&ctx, "sure"), &lexicon)
        .unwrap();
    assert_eq!(at_day.context.appointment().day.as_deref(), Some("Saturday"));
    assert_eq!(at_day.context.appointment().full_day, None);

    let at_full_day = machine
        .advance(listening(Stage::FullDay), MachineEvent::ListenCompleted, &heard(&ctx, "sure"), &lexicon)
        .unwrap();
    assert_eq!(at_full_day.context.appointment().full_day, Some(true));
    assert_eq!(at_full_day.context.appointment().day, None);
}

#[test]
fn test_help_detour_resumes_same_stage() {
    let machine = SlotMachine::default();
    let lexicon = Lexicon::builtin();
    let mut ctx = SessionContext::new(0.6, 0.6);
    ctx.apply(SlotValue::Person("Gong tianyi".into()));

    let help = machine
        .advance(listening(Stage::Day), MachineEvent::ListenCompleted, &heard(&ctx, "help"), &lexicon)
        .unwrap();
    assert_eq!(help.state, DialogueState::Help { stage: Stage::Day });
    assert_eq!(help.context.history(), Some(Stage::Day));
    assert_eq!(help.context.retries(Stage::Day), 0);
    assert_eq!(help.context.appointment(), ctx.appointment());

    let resumed = machine
        .advance(help.state, MachineEvent::SpeechCompleted, &help.context, &lexicon)
        .unwrap();
    assert_eq!(resumed.state, DialogueState::collecting(Stage::Day, Phase::Prompt));
}

#[test]
fn test_retry_budget_abandons_when_configured() {
    let machine = SlotMachine::new(Some(2));
    let lexicon = Lexicon::builtin();
    let mut ctx = SessionContext::new(0.6, 0.6);
    ctx.apply(SlotValue::Person("Vladislav Maraev".into()));

    let mut state = listening(Stage::Day);
    for attempt in 1..=2 {
        let step = machine.advance(state, MachineEvent::ListenCompleted, &ctx, &lexicon).unwrap();
        assert_eq!(step.state, DialogueState::collecting(Stage::Day, Phase::Retry(RetryCause::NoInput)));
        assert_eq!(step.context.retries(Stage::Day), attempt);
        ctx = step.context;
        state = listening(Stage::Day);
    }

    let step = machine.advance(state, MachineEvent::ListenCompleted, &ctx, &lexicon).unwrap();
    assert_eq!(step.state, DialogueState::Abandoned);
    assert!(step.context.appointment().is_empty());

    let idle = machine
        .advance(step.state, MachineEvent::SpeechCompleted, &step.context, &lexicon)
        .unwrap();
    assert_eq!(idle.state, DialogueState::WaitToStart);
}

#[test]
fn test_unlimited_retries_by_default() {
    let machine = SlotMachine::default();
    let lexicon = Lexicon::builtin();
    let mut ctx = SessionContext::new(0.6, 0.6);

    for _ in 0..50 {
        let step = machine
            .advance(listening(Stage::Time), MachineEvent::ListenCompleted, &ctx, &lexicon)
            .unwrap();
        assert_ne!(step.state, DialogueState::Abandoned);
        ctx = step.context;
    }
    assert_eq!(ctx.retries(Stage::Time), 50);
}

#[test]
fn test_invalid_events_are_ignored() {
    let machine = SlotMachine::default();
    let lexicon = Lexicon::builtin();
    let ctx = SessionContext::new(0.6, 0.6);

    assert!(machine.advance(DialogueState::Prepare, MachineEvent::Start, &ctx, &lexicon).is_none());
    assert!(machine.advance(DialogueState::WaitToStart, MachineEvent::SpeechCompleted, &ctx, &lexicon).is_none());
    assert!(machine.advance(DialogueState::Completed, MachineEvent::ListenCompleted, &ctx, &lexicon).is_none());
    assert!(machine
        .advance(listening(Stage::Person), MachineEvent::SpeechCompleted, &ctx, &lexicon)
        .is_none());
    assert!(machine
        .advance(DialogueState::collecting(Stage::Person, Phase::Prompt), MachineEvent::ListenCompleted, &ctx, &lexicon)
        .is_none());
}

#[test]
fn test_nlu_entities_fill_slot_when_confident() {
    let lexicon = Lexicon::builtin();
    let nlu = NluResult {
        top_intent: "create a meeting".into(),
        confidence: 0.9,
        entities: vec![Entity {
            category: "person".into(),
            text: "Vlad".into(),
        }],
    };
    let recognition = Recognition::new("I want to meet vlad").with_nlu(nlu.clone());

    assert_eq!(
        interpret(Stage::Person, &recognition, 0.6, &lexicon),
        Some(Interpretation::Value(SlotValue::Person("Vladislav Maraev".into())))
    );
    // Entities only count for their own category
    assert_eq!(interpret(Stage::Day, &recognition, 0.6, &lexicon), None);

    let unsure = Recognition::new("I want to meet vlad").with_nlu(NluResult { confidence: 0.3, ..nlu });
    assert_eq!(interpret(Stage::Person, &unsure, 0.6, &lexicon), None);
}
