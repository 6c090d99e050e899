//! Demo game: bouncing balls over a looping music track.
//!
//! Controls:
//! - left click spawns a ball at the cursor, right click clears them
//! - Space pauses/resumes the music
//! - Up/Down change the master volume
//! - Escape quits

use crate::components::entity::{Context, Entity, EntityId, HookResult};
use crate::components::geometry::{Color, Rect, Vec2};
use crate::events::input::{KeyCode, MouseButton};
use crate::resources::audiotrack::TrackHandle;
use crate::systems::render::Painter;

const BALL_MIN_RADIUS: f32 = 6.0;
const BALL_MAX_RADIUS: f32 = 24.0;
const BALL_MAX_SPEED: f32 = 240.0;
const BALL_LIFETIME: f32 = 12.0;
const VOLUME_STEP: f32 = 0.1;
const HUD_TEXT_SIZE: f32 = 20.0;

/// Top-level entity: owns the music and spawns balls.
pub struct Game {
    music: Option<TrackHandle>,
    balls: Vec<EntityId>,
    rng: fastrand::Rng,
}

impl Game {
    pub fn new(music: Option<TrackHandle>) -> Self {
        Self {
            music,
            balls: Vec::new(),
            rng: fastrand::Rng::new(),
        }
    }

    /// Same demo with a fixed seed, for reproducible runs.
    pub fn with_seed(music: Option<TrackHandle>, seed: u64) -> Self {
        Self {
            rng: fastrand::Rng::with_seed(seed),
            ..Self::new(music)
        }
    }

    pub fn balls(&self) -> &[EntityId] {
        &self.balls
    }

    fn random_ball(&mut self, at: Vec2) -> Ball {
        let speed = BALL_MAX_SPEED;
        let velocity = Vec2::new(
            (self.rng.f32() * 2.0 - 1.0) * speed,
            (self.rng.f32() * 2.0 - 1.0) * speed,
        );
        let radius = BALL_MIN_RADIUS + self.rng.f32() * (BALL_MAX_RADIUS - BALL_MIN_RADIUS);
        let color = Color::rgb(self.rng.u8(64..), self.rng.u8(64..), self.rng.u8(64..));
        Ball::new(at, velocity, radius, color)
    }
}

impl Entity for Game {
    fn init(&mut self, ctx: &mut Context<'_>) -> HookResult {
        log::info!("demo initialising '{}'", ctx.config().title);
        Ok(())
    }

    fn start(&mut self, ctx: &mut Context<'_>) -> HookResult {
        if let Some(music) = &self.music {
            music.set_looping(true);
            ctx.mixer().play(music);
            log::info!("music started ({:.1}s)", music.duration().as_secs_f32());
        }
        Ok(())
    }

    fn update(&mut self, ctx: &mut Context<'_>) -> HookResult {
        let input = ctx.input();
        let spawn = input.is_mouse_down(MouseButton::Left);
        let clear = input.is_mouse_down(MouseButton::Right);
        let toggle_music = input.is_down(KeyCode::SPACE);
        let louder = input.is_down(KeyCode::UP);
        let quieter = input.is_down(KeyCode::DOWN);
        let quit = input.is_down(KeyCode::ESCAPE);

        if spawn {
            let ball = self.random_ball(ctx.cursor());
            let id = ctx.spawn(ball);
            self.balls.push(id);
        }
        if clear {
            for &id in &self.balls {
                ctx.destroy(id);
            }
            self.balls.clear();
        }
        if toggle_music {
            if let Some(music) = &self.music {
                if ctx.mixer().is_playing(music) {
                    ctx.mixer().stop(music);
                } else {
                    ctx.mixer().play(music);
                }
            }
        }
        if louder || quieter {
            let step = if louder { VOLUME_STEP } else { -VOLUME_STEP };
            let gain = (ctx.mixer().gain() + step).clamp(0.0, 2.0);
            ctx.mixer().set_gain(gain);
            ctx.config_mut().master_volume = gain;
        }
        if quit {
            ctx.quit();
        }

        // Balls expire on their own; forget ids that are gone for good.
        let registry = ctx.registry();
        self.balls
            .retain(|&id| registry.is_live(id) || registry.is_pending(id));
        Ok(())
    }

    fn paint(&mut self, ctx: &mut Context<'_>, painter: &mut Painter<'_>) -> HookResult {
        let (width, _) = ctx.config().window_size();
        let hud = format!(
            "balls: {}  volume: {:.1}  fps: {:.0}",
            self.balls.len(),
            ctx.mixer().gain(),
            1.0 / ctx.delta_time().max(f32::EPSILON)
        );
        painter.set_rotation(0.0);
        painter.set_color(Color::WHITE);
        painter.text(&hud, Rect::new(10.0, 10.0, width as f32 - 20.0, HUD_TEXT_SIZE), HUD_TEXT_SIZE);
        Ok(())
    }

    fn end(&mut self, ctx: &mut Context<'_>) -> HookResult {
        ctx.mixer().stop_all();
        if let Err(e) = ctx.config().save_to_file() {
            log::warn!("could not save config: {e}");
        }
        Ok(())
    }
}

/// A ball bouncing inside the window until its lifetime runs out.
pub struct Ball {
    position: Vec2,
    velocity: Vec2,
    radius: f32,
    color: Color,
    age: f32,
}

impl Ball {
    pub fn new(position: Vec2, velocity: Vec2, radius: f32, color: Color) -> Self {
        Self {
            position,
            velocity,
            radius,
            color,
            age: 0.0,
        }
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    fn bounce(&mut self, bounds: Vec2) {
        if self.position.x - self.radius < 0.0 {
            self.position.x = self.radius;
            self.velocity.x = self.velocity.x.abs();
        } else if self.position.x + self.radius > bounds.x {
            self.position.x = bounds.x - self.radius;
            self.velocity.x = -self.velocity.x.abs();
        }
        if self.position.y - self.radius < 0.0 {
            self.position.y = self.radius;
            self.velocity.y = self.velocity.y.abs();
        } else if self.position.y + self.radius > bounds.y {
            self.position.y = bounds.y - self.radius;
            self.velocity.y = -self.velocity.y.abs();
        }
    }
}

impl Entity for Ball {
    fn update(&mut self, ctx: &mut Context<'_>) -> HookResult {
        let dt = ctx.delta_time();
        self.age += dt;
        if self.age >= BALL_LIFETIME {
            ctx.destroy_self();
            return Ok(());
        }
        let (width, height) = ctx.config().window_size();
        self.position = self.position + self.velocity * dt;
        self.bounce(Vec2::new(width as f32, height as f32));
        Ok(())
    }

    fn paint(&mut self, _ctx: &mut Context<'_>, painter: &mut Painter<'_>) -> HookResult {
        let fade = 1.0 - (self.age / BALL_LIFETIME).clamp(0.0, 1.0);
        painter.set_color(Color::rgba(
            self.color.r,
            self.color.g,
            self.color.b,
            (fade * 255.0) as u8,
        ));
        painter.fill_ellipse(self.position, Vec2::new(self.radius, self.radius));
        Ok(())
    }
}
