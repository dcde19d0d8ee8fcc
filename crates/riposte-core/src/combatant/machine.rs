//! Per-tick update of the combat state machine.
//!
//! [`Combatant::update`] runs the same six phases every tick:
//!
//! 1. **RESET**: clear per-tick movement and sprint; the rest timer drops to
//!    zero outside Free and Flinching
//! 2. **DEATH**: empty health forces Dead before anything else runs
//! 3. **CONTROL**: a player combatant reads its [`Intent`]; an AI combatant
//!    checks its perception gate, turns to its target and consults its
//!    policy while waiting
//! 4. **DISPATCH**: the current state's update, which may register an attack
//! 5. **REGENERATE**: passive stamina recovery
//! 6. **EMIT**: movement request and presentation conditionals

use glam::Vec2;
use tracing::{debug, info, trace};

use super::{CombatState, Combatant, Control, Steering, Strike, TargetSnapshot, TickEnv};
use crate::hit::{AttackEvent, AttackType};
use crate::intent::Intent;
use crate::policy::{Action, DecisionContext, DecisionPoint, Posture, TargetStance};
use crate::ports::{Presentation, PresentationFlags, StateTag};
use crate::profile::{BlockStyle, ExitRule};
use crate::resource::ResourcePool;

/// What a combatant knows about its target this tick.
#[derive(Debug, Clone, Copy, Default)]
struct Sighting {
    target: Option<TargetSnapshot>,
    distance: Option<f32>,
    angle: Option<f32>,
}

impl Sighting {
    fn distance(&self) -> Option<f32> {
        self.target.and(self.distance)
    }
}

impl Combatant {
    /// Advances the combatant by `dt` seconds.
    ///
    /// `intent` is read only for player-controlled combatants. Returns the
    /// strike registered this tick, if an attack connected; the caller
    /// delivers it to the target through [`Combatant::take_hit`].
    pub fn update(
        &mut self,
        dt: f32,
        intent: &Intent,
        env: &mut TickEnv<'_, '_>,
    ) -> Option<Strike> {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };

        self.reset_transient();

        if self.health.is_depleted() && self.state != CombatState::Dead {
            self.enter(CombatState::Dead);
        }

        let mut sighting = self.observe(env);
        if self.state != CombatState::Dead {
            match self.control {
                Control::Player => self.read_intent(intent),
                Control::Ai => self.think(dt, &mut sighting, env),
            }
        }

        let strike = self.dispatch(dt, &sighting, env);
        self.regenerate(dt);
        self.emit(env);
        strike
    }

    // =========================================================================
    // Phases
    // =========================================================================

    fn reset_transient(&mut self) {
        self.movement = Vec2::ZERO;
        self.speed_scale = 1.0;
        self.sprinting = false;
        if !self.state.is_rest_eligible() {
            self.timers.rest = 0.0;
        }
    }

    fn observe(&self, env: &TickEnv<'_, '_>) -> Sighting {
        let Some(target) = env.target else {
            return Sighting::default();
        };
        let perception = env.ports.perception;
        let Some(distance) = perception.distance_to(self.id, target.id) else {
            return Sighting::default();
        };
        Sighting {
            target: Some(target),
            distance: Some(distance),
            angle: perception.angle_to(self.id, target.id),
        }
    }

    fn read_intent(&mut self, intent: &Intent) {
        let axes = intent.axes();
        self.movement = axes;

        if let Some(attack_type) = intent.attack {
            match self.state {
                CombatState::Attacking if self.profile.combo => {
                    self.combo_queued = Some(attack_type);
                }
                CombatState::Dodging if self.profile.dodge_into_attack => {
                    self.attack_after_dodge = Some(attack_type);
                }
                _ if self.can_attack() => self.begin_attack(attack_type),
                _ => {}
            }
        }

        let can_guard = self.profile.block_style != BlockStyle::Unavailable
            && self.state.is_waiting()
            && self.has_stamina();
        self.guarding = intent.block && can_guard;
        if self.guarding
            && self.profile.block_style == BlockStyle::Stance
            && self.state == CombatState::Free
        {
            self.enter(CombatState::Blocking);
        }

        self.sprinting = intent.sprint && !self.guarding;

        if intent.dodge && self.can_dodge() {
            self.begin_dodge(axes);
        }
    }

    fn think(&mut self, dt: f32, sighting: &mut Sighting, env: &mut TickEnv<'_, '_>) {
        if !self.active {
            if self.sees_target(sighting, env) {
                self.activate();
            } else {
                return;
            }
        }

        if sighting.target.is_some() && self.can_rotate() {
            if let Some(angle) = sighting.angle {
                self.turn(angle);
                sighting.angle = Some(0.0);
            }
        }

        if !self.state.is_waiting() {
            return;
        }
        if self.blocked_attack {
            self.timers.decision = 0.0;
            return;
        }
        self.timers.decision += dt;
        let (action, paced) = self.consult(DecisionPoint::Waiting, sighting, env);
        let changed = self.apply_action(action, sighting);
        if paced || changed {
            self.timers.decision = 0.0;
        }
    }

    fn dispatch(
        &mut self,
        dt: f32,
        sighting: &Sighting,
        env: &mut TickEnv<'_, '_>,
    ) -> Option<Strike> {
        self.state_ticks = self.state_ticks.saturating_add(1);
        match self.state {
            CombatState::Free => {
                self.update_free(dt, sighting);
                None
            }
            CombatState::Blocking => {
                self.update_blocking(dt);
                None
            }
            CombatState::Attacking => self.update_attacking(dt, sighting, env),
            CombatState::RunningAttack => {
                self.update_running_attack(dt, sighting);
                None
            }
            CombatState::Dodging => {
                self.update_dodging(dt, sighting, env);
                None
            }
            CombatState::Flinching => {
                self.update_flinching(dt, sighting, env);
                None
            }
            CombatState::Dead => {
                self.movement = Vec2::ZERO;
                None
            }
        }
    }

    fn regenerate(&mut self, dt: f32) {
        if !self.state.is_rest_eligible() || self.sprinting || self.guarding {
            self.timers.rest = 0.0;
            return;
        }
        self.timers.rest += dt;
        if self.timers.rest >= self.profile.timings.rest_threshold {
            let amount = self.profile.costs.regen_per_second * dt;
            if let Some(stamina) = self.stamina.as_mut() {
                stamina.restore(amount);
            }
        }
    }

    fn emit(&mut self, env: &mut TickEnv<'_, '_>) {
        env.ports
            .movement
            .apply_movement(self.id, self.movement, self.speed_scale);
        let presentation = self.build_presentation();
        presentation.emit(self.id, &mut *env.ports.presentation);
        self.presentation = presentation;
        self.dying = false;
    }

    // =========================================================================
    // State updates
    // =========================================================================

    fn update_free(&mut self, dt: f32, sighting: &Sighting) {
        if self.control == Control::Ai {
            self.steer(sighting);
            if self.state != CombatState::Free {
                return;
            }
        }

        let mut planar = self.movement;
        if planar != Vec2::ZERO && planar.y >= 0.0 && self.sprinting && self.has_stamina() {
            self.speed_scale = self.profile.sprint_multiplier;
            self.spend_stamina(self.profile.costs.sprint_per_second * dt);
        } else {
            self.sprinting = false;
        }

        if self.guarding || self.blocked_attack {
            planar = Vec2::ZERO;
            self.sprinting = false;
            self.speed_scale = 1.0;
        }
        self.movement = planar;
        self.advance_stall(dt);
    }

    fn update_blocking(&mut self, dt: f32) {
        self.movement = Vec2::ZERO;
        if self.blocked_attack {
            self.advance_stall(dt);
        } else if !self.guarding {
            self.enter(CombatState::Free);
        }
    }

    fn update_attacking(
        &mut self,
        dt: f32,
        sighting: &Sighting,
        env: &mut TickEnv<'_, '_>,
    ) -> Option<Strike> {
        self.movement = Vec2::ZERO;
        self.timers.attack += dt;

        let windup = self.profile.timings.windup(self.attack_type);
        let mut strike = None;
        if !self.attack_registered && self.timers.attack >= windup {
            self.attack_registered = true;
            strike = self.register_attack(sighting);
        }

        if self.attack_registered
            && self.timers.attack >= windup + self.profile.timings.attack_recovery
        {
            match self.combo_queued.take() {
                Some(next) if self.profile.combo && self.has_stamina() => self.begin_attack(next),
                _ => self.finish(DecisionPoint::AttackFinished, sighting, env),
            }
        }
        strike
    }

    fn update_running_attack(&mut self, dt: f32, sighting: &Sighting) {
        let Some(distance) = sighting.distance() else {
            self.enter(CombatState::Free);
            return;
        };
        if distance < self.profile.reach.attack_range {
            self.begin_attack(AttackType::Basic);
            return;
        }
        if !self.has_stamina() {
            self.enter(CombatState::Free);
            return;
        }
        self.sprinting = true;
        self.movement = Vec2::Y;
        self.speed_scale = self.profile.sprint_multiplier;
        self.spend_stamina(self.profile.costs.sprint_per_second * dt);
    }

    fn update_dodging(&mut self, dt: f32, sighting: &Sighting, env: &mut TickEnv<'_, '_>) {
        self.timers.dodge += dt;
        if self.timers.dodge <= self.profile.timings.dodge_impulse_window {
            self.movement = self.dodge_direction;
            self.speed_scale = self.profile.dodge_impulse;
        } else {
            self.movement = Vec2::ZERO;
        }

        let done = match self.profile.recovery_exit {
            ExitRule::Timed => self.timers.dodge > self.profile.timings.dodge_duration,
            ExitRule::AnimationFinished => self.animation_finished(StateTag::Dodge, env),
        };
        if !done {
            return;
        }

        match self.attack_after_dodge.take() {
            Some(attack_type) if self.profile.dodge_into_attack && self.has_stamina() => {
                self.enter(CombatState::Free);
                self.begin_attack(attack_type);
            }
            _ => self.finish(DecisionPoint::DodgeFinished, sighting, env),
        }
    }

    fn update_flinching(&mut self, dt: f32, sighting: &Sighting, env: &mut TickEnv<'_, '_>) {
        self.movement = Vec2::ZERO;
        self.timers.flinch += dt;
        let timings = &self.profile.timings;
        let done = match self.profile.recovery_exit {
            ExitRule::Timed => self.timers.flinch > timings.flinch + timings.flinch_tail,
            ExitRule::AnimationFinished => self.animation_finished(StateTag::Flinch, env),
        };
        if done {
            self.finish(DecisionPoint::FlinchFinished, sighting, env);
        }
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// Switches state and applies the entry effects. Dead is terminal.
    pub(crate) fn enter(&mut self, next: CombatState) {
        if self.state == CombatState::Dead {
            return;
        }
        debug!(combatant = %self.id, from = %self.state, to = %next, "state transition");
        self.state = next;
        self.state_ticks = 0;

        match next {
            CombatState::Free => {
                self.blocked_attack = false;
                self.combo_queued = None;
                self.attack_after_dodge = None;
            }
            CombatState::Blocking => {
                self.blocked_attack = false;
                self.timers.block = 0.0;
                self.guarding = true;
            }
            CombatState::Attacking => {
                self.timers.attack = 0.0;
                self.attack_registered = false;
                self.combo_queued = None;
                self.guarding = false;
            }
            CombatState::RunningAttack => {
                self.guarding = false;
                self.steering = Steering::Hold;
            }
            CombatState::Dodging => {
                self.timers.dodge = 0.0;
                self.guarding = false;
                self.blocked_attack = false;
                self.attack_after_dodge = None;
            }
            CombatState::Flinching => {
                self.timers.flinch = 0.0;
                self.guarding = false;
                self.blocked_attack = false;
                self.combo_queued = None;
                self.attack_after_dodge = None;
                self.steering = Steering::Hold;
            }
            CombatState::Dead => {
                self.dying = true;
                self.guarding = false;
                self.blocked_attack = false;
                self.sprinting = false;
                self.combo_queued = None;
                self.attack_after_dodge = None;
                self.steering = Steering::Hold;
                self.movement = Vec2::ZERO;
                info!(combatant = %self.id, archetype = %self.profile.archetype, "combatant died");
            }
        }

        if !next.is_rest_eligible() {
            self.timers.rest = 0.0;
        }
    }

    fn begin_attack(&mut self, attack_type: AttackType) {
        self.spend_stamina(self.profile.costs.attack);
        self.attack_type = attack_type;
        self.steering = Steering::Hold;
        self.enter(CombatState::Attacking);
    }

    fn begin_dodge(&mut self, direction: Vec2) {
        self.spend_stamina(self.profile.costs.dodge);
        self.dodge_direction = direction.normalize_or_zero();
        self.steering = Steering::Hold;
        self.enter(CombatState::Dodging);
    }

    /// Returns to Free and, for an active AI, asks the policy what next.
    fn finish(&mut self, point: DecisionPoint, sighting: &Sighting, env: &mut TickEnv<'_, '_>) {
        self.enter(CombatState::Free);
        if self.control == Control::Ai && self.active {
            let (action, _) = self.consult(point, sighting, env);
            self.apply_action(action, sighting);
            self.timers.decision = 0.0;
        }
    }

    fn advance_stall(&mut self, dt: f32) {
        if !self.blocked_attack {
            return;
        }
        self.timers.block += dt;
        if self.timers.block >= self.profile.timings.blocked_stall {
            self.blocked_attack = false;
        }
    }

    fn register_attack(&self, sighting: &Sighting) -> Option<Strike> {
        let (Some(target), Some(distance), Some(angle)) =
            (sighting.target, sighting.distance, sighting.angle)
        else {
            debug!(combatant = %self.id, "attack registered with no target");
            return None;
        };
        let reach = &self.profile.reach;
        if distance > reach.attack_range || angle.abs() >= reach.attack_angle * 0.5 {
            debug!(combatant = %self.id, distance, angle, "attack missed");
            return None;
        }
        let damage = self.profile.damage.for_attack(self.attack_type);
        Some(Strike {
            attacker: self.id,
            target: target.id,
            event: AttackEvent::new(self.position, damage, self.attack_type),
        })
    }

    fn animation_finished(&self, tag: StateTag, env: &TickEnv<'_, '_>) -> bool {
        self.state_ticks > 1 && env.ports.presentation.is_animation_finished(self.id, tag)
    }

    // =========================================================================
    // AI
    // =========================================================================

    fn sees_target(&self, sighting: &Sighting, env: &TickEnv<'_, '_>) -> bool {
        let (Some(target), Some(distance), Some(angle)) =
            (sighting.target, sighting.distance, sighting.angle)
        else {
            return false;
        };
        let sight = &self.profile.sight;
        distance <= sight.radius
            && angle.abs() <= sight.field_of_view * 0.5
            && env.ports.perception.can_see(self.id, target.id)
    }

    fn turn(&mut self, degrees: f32) {
        let turned = Vec2::from_angle(degrees.to_radians())
            .rotate(self.facing)
            .normalize_or_zero();
        if turned != Vec2::ZERO {
            self.facing = turned;
        }
    }

    fn posture(&self) -> Posture {
        match self.state {
            CombatState::Blocking => Posture::Guarding,
            CombatState::Free if self.guarding => Posture::Guarding,
            CombatState::Free => match self.steering {
                Steering::Hold => Posture::Holding,
                Steering::Advance => Posture::Advancing,
                Steering::Retreat => Posture::Retreating,
                Steering::Charge => Posture::Charging,
            },
            _ => Posture::Busy,
        }
    }

    /// Asks the policy for an action. The flag is set when the answer spent
    /// the decision cadence.
    fn consult(
        &self,
        point: DecisionPoint,
        sighting: &Sighting,
        env: &mut TickEnv<'_, '_>,
    ) -> (Action, bool) {
        let Some(policy) = env.policy else {
            return (Action::Stay, false);
        };
        let ctx = DecisionContext {
            point,
            state: self.state,
            posture: self.posture(),
            stamina: self.stamina.as_ref().map(ResourcePool::get),
            distance: sighting.distance(),
            target: TargetStance::of(sighting.target.as_ref()),
            ready: self.timers.decision >= self.profile.timings.decision_interval,
        };
        let action = policy.decide(&ctx, &mut *env.rng);
        if action != Action::Stay {
            trace!(combatant = %self.id, ?point, %action, "decision");
        }
        (action, policy.paces(&ctx))
    }

    /// Applies a policy action. Returns `true` when anything changed.
    fn apply_action(&mut self, action: Action, sighting: &Sighting) -> bool {
        match action {
            Action::Stay => false,
            Action::Attack(attack_type) => {
                if self.can_attack() {
                    self.begin_attack(attack_type);
                    true
                } else {
                    false
                }
            }
            Action::Block => self.raise_guard(),
            Action::Dodge(direction) => {
                if self.state.is_waiting() && self.has_stamina() && !self.blocked_attack {
                    self.begin_dodge(direction.vector());
                    true
                } else {
                    false
                }
            }
            Action::SprintApproach => {
                if !self.has_stamina() || sighting.distance().is_none() {
                    false
                } else if self.profile.running_attack {
                    self.enter(CombatState::RunningAttack);
                    true
                } else {
                    self.set_steering(Steering::Charge)
                }
            }
            Action::Advance => self.set_steering(Steering::Advance),
            Action::Retreat => self.set_steering(Steering::Retreat),
            Action::Rest => self.set_steering(Steering::Hold),
        }
    }

    fn raise_guard(&mut self) -> bool {
        if !self.has_stamina() {
            return false;
        }
        match self.profile.block_style {
            BlockStyle::Unavailable => false,
            BlockStyle::Stance => {
                if self.state == CombatState::Blocking {
                    let changed = !self.guarding;
                    self.guarding = true;
                    changed
                } else {
                    self.steering = Steering::Hold;
                    self.enter(CombatState::Blocking);
                    true
                }
            }
            BlockStyle::Guard => {
                if self.guarding {
                    false
                } else {
                    self.guarding = true;
                    self.steering = Steering::Hold;
                    true
                }
            }
        }
    }

    /// Drops any guard and sets the steering. Returns `true` when anything
    /// changed.
    fn set_steering(&mut self, steering: Steering) -> bool {
        let changed =
            self.steering != steering || self.guarding || self.state == CombatState::Blocking;
        self.steering = steering;
        self.guarding = false;
        if self.state == CombatState::Blocking {
            self.enter(CombatState::Free);
        }
        changed
    }

    fn steer(&mut self, sighting: &Sighting) {
        let distance = sighting.distance();
        match self.steering {
            Steering::Hold => {}
            Steering::Advance => match distance {
                Some(d) if d > self.profile.reach.engage_distance => self.movement = Vec2::Y,
                Some(_) => {}
                None => self.steering = Steering::Hold,
            },
            Steering::Retreat => {
                if distance.is_some() {
                    self.movement = Vec2::NEG_Y;
                } else {
                    self.steering = Steering::Hold;
                }
            }
            Steering::Charge => match distance {
                None => self.steering = Steering::Hold,
                Some(d) if d < self.profile.reach.attack_range => {
                    self.steering = Steering::Hold;
                    if self.can_attack() {
                        self.begin_attack(AttackType::Basic);
                    }
                }
                Some(_) if !self.has_stamina() => self.steering = Steering::Hold,
                Some(_) => {
                    self.movement = Vec2::Y;
                    self.sprinting = true;
                }
            },
        }
    }

    // =========================================================================
    // Presentation
    // =========================================================================

    fn build_presentation(&self) -> Presentation {
        let mut flags = PresentationFlags::empty();
        flags.set(PresentationFlags::IDLE, self.movement == Vec2::ZERO);
        flags.set(PresentationFlags::MOVING_FORWARD, self.movement.y >= 0.0);
        flags.set(PresentationFlags::ATTACKING, self.state == CombatState::Attacking);
        flags.set(PresentationFlags::DODGING, self.state == CombatState::Dodging);
        flags.set(PresentationFlags::SPRINTING, self.sprinting);
        flags.set(PresentationFlags::FLINCHING, self.state == CombatState::Flinching);
        flags.set(PresentationFlags::BLOCKING, self.is_blocking());
        flags.set(PresentationFlags::DEAD, self.state == CombatState::Dead);
        flags.set(PresentationFlags::DYING, self.dying);
        flags.set(PresentationFlags::BLOCKED_ATTACK, self.blocked_attack);
        flags.set(PresentationFlags::CONTINUE_ATTACK, self.combo_queued.is_some());
        Presentation {
            flags,
            x_velocity: self.movement.x,
            z_velocity: self.movement.y,
            combo: self.profile.combo,
        }
    }
}
