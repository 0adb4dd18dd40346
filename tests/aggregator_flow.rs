use futures_util::StreamExt;
use kitchen_timer::speech::SessionState;
use kitchen_timer::{
    AggregatorConfig, Config, Phrase, RecognitionEvent, RecognitionResult, ScriptedEngine,
    SpeechAggregator,
};
use std::time::Duration;

fn interim(text: &str) -> RecognitionEvent {
    RecognitionEvent::Result {
        results: vec![RecognitionResult::interim([text])],
    }
}

fn finalized(text: &str) -> RecognitionEvent {
    RecognitionEvent::Result {
        results: vec![RecognitionResult::finalized([text])],
    }
}

#[tokio::test]
async fn each_utterance_gets_its_own_stream() {
    let engine = ScriptedEngine::new().with_session(vec![
        interim("start"),
        finalized("start the eggs"),
        RecognitionEvent::Result {
            results: vec![
                RecognitionResult::finalized(["start the eggs"]),
                RecognitionResult::interim(["stop"]),
            ],
        },
        RecognitionEvent::Result {
            results: vec![
                RecognitionResult::finalized(["start the eggs"]),
                RecognitionResult::finalized(["stop the rice"]),
            ],
        },
    ]);

    // Inner streams are fed by polling the outer one; drain it first.
    let streams: Vec<_> = SpeechAggregator::new(engine).collect().await;
    let mut finals = Vec::new();
    for phrases in streams {
        let phrases: Vec<Phrase> = phrases.unwrap().collect().await;
        finals.push(phrases.last().cloned());
    }

    assert_eq!(
        finals,
        vec![
            Some(Phrase::finalized(["start the eggs"])),
            Some(Phrase::finalized(["stop the rice"])),
        ]
    );
}

#[tokio::test]
async fn final_arriving_with_next_interim_closes_utterance() {
    let engine = ScriptedEngine::new().with_session(vec![
        interim("start the eggs"),
        RecognitionEvent::Result {
            results: vec![
                RecognitionResult::finalized(["start the eggs"]),
                RecognitionResult::interim(["stop"]),
            ],
        },
        RecognitionEvent::Result {
            results: vec![
                RecognitionResult::finalized(["start the eggs"]),
                RecognitionResult::finalized(["stop the rice"]),
            ],
        },
    ]);

    let streams: Vec<_> = SpeechAggregator::new(engine).collect().await;
    let mut utterances = Vec::new();
    for phrases in streams {
        let phrases: Vec<Phrase> = phrases.unwrap().collect().await;
        utterances.push(phrases);
    }

    assert_eq!(
        utterances,
        vec![
            vec![
                Phrase::interim("start the eggs"),
                Phrase::finalized(["start the eggs"]),
            ],
            vec![Phrase::interim("stop"), Phrase::finalized(["stop the rice"])],
        ]
    );
}

#[tokio::test]
async fn spontaneous_end_restarts_transparently() {
    let engine = ScriptedEngine::new()
        .with_session(vec![interim("five"), RecognitionEvent::End])
        .with_session(vec![interim("five minutes"), RecognitionEvent::End])
        .with_session(vec![finalized("five minutes")]);
    let probe = engine.probe();

    let streams: Vec<_> = SpeechAggregator::new(engine).collect().await;

    assert_eq!(streams.len(), 1);
    let phrases = streams.into_iter().next().unwrap().unwrap();
    let phrases: Vec<Phrase> = phrases.collect().await;
    assert_eq!(phrases.len(), 3);
    assert!(phrases.last().unwrap().is_final());
    assert_eq!(probe.starts(), 3);
}

#[tokio::test]
async fn config_disables_restart() {
    let mut config = Config::default();
    config.recognition.restart_on_end = false;
    let engine = ScriptedEngine::new()
        .with_session(vec![interim("five"), RecognitionEvent::End])
        .with_session(vec![finalized("five minutes")]);
    let probe = engine.probe();

    let aggregator = SpeechAggregator::with_config(engine, AggregatorConfig::from_config(&config));
    let streams: Vec<_> = aggregator.collect().await;

    assert_eq!(streams.len(), 1);
    let phrases = streams.into_iter().next().unwrap().unwrap();
    assert_eq!(phrases.final_phrase().await, None);
    assert_eq!(probe.starts(), 1);
}

#[tokio::test]
async fn stop_from_another_task_completes_the_stream() {
    let engine = ScriptedEngine::new()
        .with_session(vec![finalized("help")])
        .keep_running();
    let probe = engine.probe();
    let mut aggregator = SpeechAggregator::new(engine);
    let stop = aggregator.stop_handle();

    let first = aggregator.next().await.unwrap().unwrap();
    assert_eq!(first.final_phrase().await, Some(Phrase::finalized(["help"])));

    let stopper = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        stop.request_stop();
    });

    assert!(aggregator.next().await.is_none());
    assert_eq!(aggregator.state(), SessionState::Done);
    stopper.await.unwrap();

    // Stopped exactly once: no restart and no second stop on drop.
    drop(aggregator);
    assert_eq!(probe.starts(), 1);
    assert_eq!(probe.stops(), 1);
}

#[tokio::test]
async fn nothing_starts_until_polled() {
    let engine = ScriptedEngine::new().with_session(vec![finalized("help")]);
    let probe = engine.probe();

    let aggregator = SpeechAggregator::new(engine);
    assert_eq!(aggregator.state(), SessionState::NotStarted);
    assert_eq!(probe.starts(), 0);

    drop(aggregator);
    assert_eq!(probe.stops(), 0);
}
