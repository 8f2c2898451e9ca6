// src/io/sim.rs
//
// Deterministic simulated front end.
//
// SimRig implements every collaborator trait over a virtual clock. Key
// waits return instantly and advance the clock by the time a participant
// would have taken; nothing sleeps. It is used by the integration tests,
// the `--simulate` mode of the main binary and the batch harness.
//
// The rig infers the current trial phase from what is presented:
//   - an empty frame starts a trial (inter-trial interval)
//   - a fixation cross         → FIXATION
//   - a fresh stimulus         → RESPONSE_WINDOW (STIMULUS_VISIBLE has no wait)
//   - text during a trial      → FEEDBACK
//   - any wait without timeout → instruction screen (between trials)

use std::collections::VecDeque;
use std::io;
use std::time::Duration;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::comprehension::{Question, QuestionKind, Respondent};
use crate::executor::TrialPhase;
use crate::io::{InputDevice, Presenter, VisualElement};
use crate::stimulus::ShapeKind;
use crate::types::{Flow, Key};

/// What the simulated participant does on one stimulus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimResponse {
    /// Press the action key this long after stimulus onset.
    Press(Duration),
    Withhold,
}

#[derive(Debug, Clone)]
pub enum ResponsePolicy {
    /// Replay a fixed list, one entry per stimulus; withhold once exhausted.
    Scripted(VecDeque<SimResponse>),
    /// Stochastic participant. The go shape is whatever the comprehension
    /// check named as the action shape.
    Participant {
        p_press_go: f64,
        p_press_nogo: f64,
        rt_range_ms: (u64, u64),
    },
}

impl ResponsePolicy {
    /// Always presses for the go shape, never for the other one.
    pub fn perfect() -> Self {
        ResponsePolicy::Participant {
            p_press_go: 1.0,
            p_press_nogo: 0.0,
            rt_range_ms: (250, 650),
        }
    }

    pub fn scripted(responses: impl IntoIterator<Item = SimResponse>) -> Self {
        ResponsePolicy::Scripted(responses.into_iter().collect())
    }
}

/// Where to inject the abort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortAt {
    /// During `phase` of session trial `trial` (1-based, counted across
    /// blocks). Only phases with a wait can be interrupted.
    Trial { trial: usize, phase: TrialPhase },
    /// On the n-th instruction screen (1-based).
    Screen(usize),
    /// On the n-th comprehension question (1-based).
    Question(usize),
}

/// Answers every question correctly, except the press-meaning question of
/// the first `fail_first` attempts.
#[derive(Debug, Clone, Default)]
pub struct OracleRespondent {
    fail_first: u32,
    failed: u32,
}

impl OracleRespondent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_first(attempts: u32) -> Self {
        Self {
            fail_first: attempts,
            failed: 0,
        }
    }
}

impl Respondent for OracleRespondent {
    fn choose(&mut self, question: &Question) -> io::Result<Flow<usize>> {
        if question.kind == QuestionKind::PressMeaning && self.failed < self.fail_first {
            self.failed += 1;
            let wrong = (question.correct + 1) % question.options.len().max(1);
            return Ok(Flow::Continue(wrong));
        }
        Ok(Flow::Continue(question.correct))
    }
}

/// Replays fixed answer indices; aborts once the script runs out.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRespondent {
    answers: VecDeque<usize>,
}

impl ScriptedRespondent {
    pub fn new(answers: impl IntoIterator<Item = usize>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
        }
    }
}

impl Respondent for ScriptedRespondent {
    fn choose(&mut self, _question: &Question) -> io::Result<Flow<usize>> {
        Ok(match self.answers.pop_front() {
            Some(a) => Flow::Continue(a),
            None => Flow::Abort,
        })
    }
}

/// One presented frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub at: Duration,
    pub elements: Vec<VisualElement>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shown {
    Nothing,
    Blank,
    Fixation,
    Stimulus(ShapeKind),
    Acknowledged,
    Question,
    Text,
}

pub struct SimRig {
    clock: Duration,
    pending: Vec<VisualElement>,
    frames: Vec<Frame>,
    record_frames: bool,
    shown: Shown,
    trial: usize,
    phase: TrialPhase,
    screens: usize,
    questions: usize,
    go_shape: Option<ShapeKind>,
    responses: ResponsePolicy,
    respondent: Box<dyn Respondent>,
    abort_at: Option<AbortAt>,
    rng: ChaCha8Rng,
}

impl SimRig {
    /// Perfect participant with an oracle respondent.
    pub fn new(seed: u64) -> Self {
        Self {
            clock: Duration::ZERO,
            pending: Vec::new(),
            frames: Vec::new(),
            record_frames: true,
            shown: Shown::Nothing,
            trial: 0,
            phase: TrialPhase::Idle,
            screens: 0,
            questions: 0,
            go_shape: None,
            responses: ResponsePolicy::perfect(),
            respondent: Box::new(OracleRespondent::new()),
            abort_at: None,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn with_responses(mut self, policy: ResponsePolicy) -> Self {
        self.responses = policy;
        self
    }

    pub fn with_respondent(mut self, respondent: impl Respondent + 'static) -> Self {
        self.respondent = Box::new(respondent);
        self
    }

    pub fn with_abort(mut self, at: AbortAt) -> Self {
        self.abort_at = Some(at);
        self
    }

    /// Frame recording is on by default; batch runs turn it off.
    pub fn with_frame_recording(mut self, on: bool) -> Self {
        self.record_frames = on;
        self
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Trials started so far.
    pub fn trials_started(&self) -> usize {
        self.trial
    }

    pub fn screens_seen(&self) -> usize {
        self.screens
    }

    pub fn questions_seen(&self) -> usize {
        self.questions
    }

    fn classify(elements: &[VisualElement]) -> Shown {
        let mut shown = Shown::Blank;
        for el in elements {
            shown = match el {
                VisualElement::FixationCross => Shown::Fixation,
                VisualElement::Stimulus {
                    shape,
                    acknowledged: false,
                    ..
                } => Shown::Stimulus(*shape),
                VisualElement::Stimulus { .. } => Shown::Acknowledged,
                VisualElement::Button { .. } => Shown::Question,
                VisualElement::Text { .. } if shown == Shown::Blank => Shown::Text,
                VisualElement::Text { .. } => shown,
            };
            if matches!(shown, Shown::Question) {
                break;
            }
        }
        shown
    }

    fn take_abort(&mut self, screen: bool) -> bool {
        let hit = match self.abort_at {
            Some(AbortAt::Trial { trial, phase }) => {
                !screen && trial == self.trial && phase == self.phase
            }
            Some(AbortAt::Screen(n)) => screen && n == self.screens,
            Some(AbortAt::Question(_)) | None => false,
        };
        if hit {
            self.abort_at = None;
        }
        hit
    }

    fn draw_response(&mut self, shape: ShapeKind) -> SimResponse {
        match &mut self.responses {
            ResponsePolicy::Scripted(queue) => queue.pop_front().unwrap_or(SimResponse::Withhold),
            ResponsePolicy::Participant {
                p_press_go,
                p_press_nogo,
                rt_range_ms,
            } => {
                let p = if self.go_shape == Some(shape) {
                    *p_press_go
                } else {
                    *p_press_nogo
                };
                if self.rng.gen_bool(p.clamp(0.0, 1.0)) {
                    let (lo, hi) = *rt_range_ms;
                    SimResponse::Press(Duration::from_millis(self.rng.gen_range(lo..=hi.max(lo))))
                } else {
                    SimResponse::Withhold
                }
            }
        }
    }
}

impl Presenter for SimRig {
    fn draw(&mut self, element: &VisualElement) {
        self.pending.push(element.clone());
    }

    fn present(&mut self) -> io::Result<()> {
        let elements = std::mem::take(&mut self.pending);
        self.shown = Self::classify(&elements);
        match self.shown {
            Shown::Blank => {
                self.trial += 1;
                self.phase = TrialPhase::IntertrialWait;
            }
            Shown::Fixation => self.phase = TrialPhase::Fixation,
            Shown::Stimulus(_) | Shown::Acknowledged => self.phase = TrialPhase::ResponseWindow,
            Shown::Text
                if matches!(self.phase, TrialPhase::ResponseWindow | TrialPhase::Feedback) =>
            {
                self.phase = TrialPhase::Feedback
            }
            Shown::Text | Shown::Question | Shown::Nothing => self.phase = TrialPhase::Idle,
        }
        if self.record_frames {
            self.frames.push(Frame {
                at: self.clock,
                elements,
            });
        }
        Ok(())
    }
}

impl InputDevice for SimRig {
    fn wait_for_key(
        &mut self,
        allowed: &[Key],
        timeout: Option<Duration>,
    ) -> io::Result<Option<Key>> {
        let Some(timeout) = timeout else {
            // Instruction screen: read it and continue.
            self.phase = TrialPhase::Idle;
            self.screens += 1;
            if allowed.contains(&Key::Abort) && self.take_abort(true) {
                return Ok(Some(Key::Abort));
            }
            return Ok(allowed.first().copied());
        };

        if allowed.contains(&Key::Abort) && self.take_abort(false) {
            return Ok(Some(Key::Abort));
        }

        if let Shown::Stimulus(shape) = self.shown {
            if allowed.contains(&Key::Action) {
                if let SimResponse::Press(rt) = self.draw_response(shape) {
                    if rt < timeout {
                        self.clock += rt;
                        return Ok(Some(Key::Action));
                    }
                }
            }
        }

        self.clock += timeout;
        Ok(None)
    }

    fn now(&self) -> Duration {
        self.clock
    }
}

impl Respondent for SimRig {
    fn choose(&mut self, question: &Question) -> io::Result<Flow<usize>> {
        self.questions += 1;
        if self.abort_at == Some(AbortAt::Question(self.questions)) {
            self.abort_at = None;
            return Ok(Flow::Abort);
        }
        if question.kind == QuestionKind::ActionShape {
            self.go_shape = question
                .options
                .get(question.correct)
                .and_then(|name| ShapeKind::ALL.iter().copied().find(|s| s.name() == name));
        }
        self.respondent.choose(question)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{hold, screen};

    #[test]
    fn timed_waits_advance_the_virtual_clock() {
        let mut rig = SimRig::new(1);
        rig.present().unwrap();
        assert_eq!(rig.trials_started(), 1);
        let flow = hold(&mut rig, Duration::from_millis(500)).unwrap();
        assert_eq!(flow, Flow::Continue(()));
        assert_eq!(rig.now(), Duration::from_millis(500));
    }

    #[test]
    fn scripted_press_inside_deadline() {
        let mut rig = SimRig::new(1).with_responses(ResponsePolicy::scripted([
            SimResponse::Press(Duration::from_millis(400)),
            SimResponse::Press(Duration::from_millis(1500)),
        ]));
        let stim = VisualElement::Stimulus {
            shape: ShapeKind::Circle,
            color: crate::stimulus::ColorId::Blue,
            geometry: ShapeKind::Circle.geometry(300.0),
            acknowledged: false,
        };
        let deadline = Some(Duration::from_secs(1));

        rig.draw(&stim);
        rig.present().unwrap();
        let key = rig.wait_for_key(&[Key::Action, Key::Abort], deadline).unwrap();
        assert_eq!(key, Some(Key::Action));
        assert_eq!(rig.now(), Duration::from_millis(400));

        // Too late: counts as no response, full deadline elapses.
        rig.draw(&stim);
        rig.present().unwrap();
        let key = rig.wait_for_key(&[Key::Action, Key::Abort], deadline).unwrap();
        assert_eq!(key, None);
        assert_eq!(rig.now(), Duration::from_millis(1400));
    }

    #[test]
    fn abort_on_requested_screen() {
        let mut rig = SimRig::new(1).with_abort(AbortAt::Screen(2));
        assert_eq!(screen(&mut rig, "one").unwrap(), Flow::Continue(()));
        assert_eq!(screen(&mut rig, "two").unwrap(), Flow::Abort);
        assert_eq!(rig.frames().len(), 2);
    }

    #[test]
    fn oracle_can_fail_first_attempts() {
        let q = Question {
            kind: QuestionKind::PressMeaning,
            prompt: String::new(),
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct: 2,
        };
        let mut r = OracleRespondent::failing_first(1);
        assert_eq!(r.choose(&q).unwrap(), Flow::Continue(3));
        assert_eq!(r.choose(&q).unwrap(), Flow::Continue(2));

        let mut s = ScriptedRespondent::new([0]);
        assert_eq!(s.choose(&q).unwrap(), Flow::Continue(0));
        assert_eq!(s.choose(&q).unwrap(), Flow::Abort);
    }
}
