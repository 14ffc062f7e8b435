//! Missile Commander entry point
//!
//! Browser host on wasm32; a headless autopilot run natively.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::f64::consts::TAU;
    use std::rc::Rc;

    use glam::Vec2;
    use wasm_bindgen::prelude::*;
    use web_sys::{CanvasRenderingContext2d, Document, HtmlCanvasElement, KeyboardEvent, PointerEvent};

    use missile_commander::Settings;
    use missile_commander::audio::AudioManager;
    use missile_commander::autopilot::Autopilot;
    use missile_commander::consts::*;
    use missile_commander::highscores::{MAX_INITIALS, format_date};
    use missile_commander::leaderboard::{HighScoreService, OfflineLeaderboard};
    use missile_commander::persistence::{LocalStorage, MemoryStorage, Storage};
    use missile_commander::platform;
    use missile_commander::sim::{ExplosionKind, GamePhase, GameState, PowerUpKind, ballistics};

    /// Longest frame delta fed to the simulation (ms)
    const MAX_FRAME_MS: f64 = 100.0;

    type Service = HighScoreService<OfflineLeaderboard>;

    fn open_storage() -> Box<dyn Storage> {
        match LocalStorage::open() {
            Some(storage) => Box::new(storage),
            None => {
                log::warn!("LocalStorage unavailable - nothing will persist");
                Box::new(MemoryStorage::new())
            }
        }
    }

    /// Game instance holding all host-side state
    struct Game {
        state: GameState,
        audio: AudioManager,
        autopilot: Autopilot,
        settings: Settings,
        settings_store: Box<dyn Storage>,
        canvas: HtmlCanvasElement,
        ctx: Option<CanvasRenderingContext2d>,
        /// Initials typed so far on the entry screen
        initials: String,
        /// Computer is playing on the title screen
        attract: bool,
        /// A high-score check is in flight
        checking: bool,
        last_time: f64,
        // FPS tracking
        frame_times: [f64; 60],
        frame_index: usize,
        fps: u32,
    }

    impl Game {
        fn new(canvas: HtmlCanvasElement, settings_store: Box<dyn Storage>) -> Self {
            let settings = Settings::load(&*settings_store);
            let mut audio = AudioManager::with_seed(js_sys::Date::now() as u64);
            audio.apply_settings(&settings);
            let ctx = canvas
                .get_context("2d")
                .ok()
                .flatten()
                .and_then(|c| c.dyn_into::<CanvasRenderingContext2d>().ok());
            if ctx.is_none() {
                log::warn!("2D canvas context unavailable - rendering disabled");
            }
            Self {
                state: GameState::new(js_sys::Date::now() as u64),
                audio,
                autopilot: Autopilot::default(),
                settings,
                settings_store,
                canvas,
                ctx,
                initials: String::new(),
                attract: false,
                checking: false,
                last_time: 0.0,
                frame_times: [0.0; 60],
                frame_index: 0,
                fps: 0,
            }
        }

        /// Fresh run with a new seed; the cached leaderboard carries over
        fn start(&mut self, attract: bool) {
            let seed = js_sys::Date::now() as u64;
            let scores = std::mem::take(&mut self.state.high_scores.entries);
            self.state = GameState::new(seed);
            self.state.set_high_scores(scores);
            self.state.start_game();
            self.attract = attract;
            self.checking = false;
            self.initials.clear();
            self.autopilot = Autopilot::default();
            if !attract {
                self.audio.resume();
            }
            log::info!("Game started with seed: {} (attract: {})", seed, attract);
        }

        /// Back to an idle title screen
        fn to_menu(&mut self) {
            let scores = std::mem::take(&mut self.state.high_scores.entries);
            self.state = GameState::new(js_sys::Date::now() as u64);
            self.state.set_high_scores(scores);
            self.attract = false;
            self.checking = false;
        }

        fn update(&mut self, dt: f64, time: f64) {
            self.state.update_game(dt);

            if self.attract {
                if self.state.phase == GamePhase::Playing {
                    self.autopilot.update(&mut self.state);
                } else {
                    // Demo games never reach the leaderboard
                    self.start(true);
                }
            }

            let events = self.state.take_events();
            if !self.attract {
                self.audio.play_events(&events);
            }

            // Track frame times for FPS
            self.frame_times[self.frame_index] = time;
            self.frame_index = (self.frame_index + 1) % 60;
            let oldest_time = self.frame_times[self.frame_index];
            if oldest_time > 0.0 {
                let elapsed = time - oldest_time;
                if elapsed > 0.0 {
                    self.fps = (60000.0 / elapsed).round() as u32;
                }
            }
        }

        fn fire(&mut self, px: f32, py: f32) {
            let w = self.canvas.client_width() as f32;
            let h = self.canvas.client_height() as f32;
            if let Some(target) = platform::pointer_to_world(px, py, w, h) {
                self.state.launch_interceptor(target);
            }
        }

        fn toggle_sound(&mut self) {
            let enabled = self.settings.toggle_sound();
            self.audio.set_enabled(enabled);
            if let Err(e) = self.settings.save(&mut *self.settings_store) {
                log::warn!("Could not save settings: {}", e);
            }
        }

        /// Draw the current frame
        fn render(&self) {
            let Some(ctx) = &self.ctx else { return };
            let w = self.canvas.width() as f32;
            let h = self.canvas.height() as f32;
            let now = self.state.now_ms();
            let scale = platform::world_scale(w, h) as f64;
            let at = |p: Vec2| platform::world_to_screen(p, w, h);

            ctx.set_global_alpha(1.0);
            ctx.set_fill_style_str("#05060f");
            ctx.fill_rect(0.0, 0.0, w as f64, h as f64);

            // Ground
            let left = at(Vec2::new(-12.0, GROUND_Y));
            let right = at(Vec2::new(12.0, GROUND_Y));
            ctx.set_stroke_style_str("#3a5a2a");
            ctx.set_line_width(2.0);
            ctx.begin_path();
            ctx.move_to(left.x as f64, left.y as f64);
            ctx.line_to(right.x as f64, right.y as f64);
            ctx.stroke();

            // Cities
            for city in &self.state.cities {
                let p = at(Vec2::new(city.x - 0.5, GROUND_Y + 0.6));
                ctx.set_fill_style_str(if city.destroyed { "#2a2a2a" } else { "#4fc3f7" });
                ctx.fill_rect(p.x as f64, p.y as f64, scale, 0.6 * scale);
            }

            // Shield dome
            if self.state.effects.shield_active(now) {
                let c = at(Vec2::new(0.0, GROUND_Y));
                ctx.set_stroke_style_str("#80deea");
                ctx.set_global_alpha(0.5);
                ctx.begin_path();
                ctx.arc(c.x as f64, c.y as f64, 9.0 * scale, std::f64::consts::PI, TAU).ok();
                ctx.stroke();
                ctx.set_global_alpha(1.0);
            }

            // Missiles with their trails
            ctx.set_stroke_style_str("#ff5252");
            for missile in &self.state.missiles {
                let progress =
                    ballistics::missile_progress(now - missile.start_ms, missile.speed).min(1.0);
                ctx.begin_path();
                for i in 0..=16 {
                    let t = progress * i as f32 / 16.0;
                    let p = at(ballistics::missile_position(missile.origin, missile.target, t));
                    if i == 0 {
                        ctx.move_to(p.x as f64, p.y as f64);
                    } else {
                        ctx.line_to(p.x as f64, p.y as f64);
                    }
                }
                ctx.stroke();
            }

            // Interceptors
            ctx.set_stroke_style_str("#69f0ae");
            for interceptor in &self.state.interceptors {
                let a = at(interceptor.start);
                let b = at(interceptor.position(now));
                ctx.begin_path();
                ctx.move_to(a.x as f64, a.y as f64);
                ctx.line_to(b.x as f64, b.y as f64);
                ctx.stroke();
            }

            // Explosions fade out over their lifetime
            for explosion in &self.state.explosions {
                let c = at(explosion.center);
                let life = (explosion.age(now) / explosion.duration_ms).clamp(0.0, 1.0);
                ctx.set_global_alpha(1.0 - life);
                ctx.set_fill_style_str(match explosion.kind {
                    ExplosionKind::Interceptor => "#ffd54f",
                    ExplosionKind::Impact => "#ff7043",
                });
                ctx.begin_path();
                ctx.arc(
                    c.x as f64,
                    c.y as f64,
                    explosion.radius_at(now) as f64 * scale,
                    0.0,
                    TAU,
                )
                .ok();
                ctx.fill();
            }

            // Power-ups
            for power_up in &self.state.power_ups {
                let c = at(power_up.pos);
                ctx.set_global_alpha(power_up.opacity(now, &self.state.tuning) as f64);
                ctx.set_fill_style_str(match power_up.kind {
                    PowerUpKind::ScoreMultiplier => "#ffeb3b",
                    PowerUpKind::Shield => "#40c4ff",
                    PowerUpKind::RapidFire => "#e040fb",
                });
                ctx.begin_path();
                ctx.arc(c.x as f64, c.y as f64, 0.35 * scale, 0.0, TAU).ok();
                ctx.fill();
            }
            ctx.set_global_alpha(1.0);
        }

        /// Update HUD and overlay elements in the DOM
        fn update_hud(&self, document: &Document) {
            let set_text = |selector: &str, text: &str| {
                if let Some(el) = document.query_selector(selector).ok().flatten() {
                    el.set_text_content(Some(text));
                }
            };
            let show = |id: &str, visible: bool| {
                if let Some(el) = document.get_element_by_id(id) {
                    let _ = el.set_attribute("class", if visible { "" } else { "hidden" });
                }
            };

            let state = &self.state;
            set_text("#hud-score .hud-value", &state.score.to_string());
            set_text("#hud-level .hud-value", &state.level.to_string());
            set_text("#hud-cities .hud-value", &state.active_cities().count().to_string());
            set_text("#hud-multiplier .hud-value", &format!("x{:.1}", state.score_multiplier));
            set_text("#hud-fps .hud-value", &self.fps.to_string());
            show("hud-fps", self.settings.show_fps);
            set_text("#sound-toggle", if self.settings.sound_enabled { "Sound: on" } else { "Sound: off" });

            let phase = if self.attract { GamePhase::Menu } else { state.phase };
            show("menu", phase == GamePhase::Menu);
            show("checking", phase == GamePhase::CheckingHighScore);
            show("enter-initials", phase == GamePhase::EnterHighScore);
            show("game-over", phase == GamePhase::GameOver);

            if phase == GamePhase::EnterHighScore {
                set_text("#initials-value", &format!("{:_<3}", self.initials));
            }
            if phase == GamePhase::GameOver {
                set_text("#final-score", &state.score.to_string());
                set_text("#final-level", &state.level.to_string());
            }

            let now = platform::unix_time_ms();
            let table: Vec<String> = state
                .high_scores
                .entries
                .iter()
                .enumerate()
                .map(|(i, e)| {
                    format!(
                        "{:>2}. {:<3} {:>8}  L{:<2} {}",
                        i + 1,
                        e.initials,
                        e.score,
                        e.level,
                        format_date(e.timestamp, now)
                    )
                })
                .collect();
            set_text("#highscore-list", &table.join("\n"));
        }
    }

    pub async fn run() {
        console_error_panic_hook::set_once();
        let _ = console_log::init_with_level(log::Level::Info);

        log::info!("Missile Commander starting...");

        let Some(window) = web_sys::window() else { return };
        let Some(document) = window.document() else { return };

        // Hide loading indicator
        if let Some(loading) = document.get_element_by_id("loading") {
            let _ = loading.set_attribute("class", "hidden");
        }

        let Some(canvas) = document
            .get_element_by_id("canvas")
            .and_then(|el| el.dyn_into::<HtmlCanvasElement>().ok())
        else {
            log::error!("No #canvas element found");
            return;
        };

        // Set canvas size
        let dpr = window.device_pixel_ratio();
        canvas.set_width((canvas.client_width() as f64 * dpr) as u32);
        canvas.set_height((canvas.client_height() as f64 * dpr) as u32);

        let service = Rc::new(HighScoreService::new(OfflineLeaderboard, open_storage()));
        let game = Rc::new(RefCell::new(Game::new(canvas.clone(), open_storage())));

        if game.borrow().settings.attract_mode {
            game.borrow_mut().start(true);
        }

        // Initial leaderboard
        {
            let game = game.clone();
            let service = service.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let scores = service.load_high_scores().await;
                game.borrow_mut().state.set_high_scores(scores);
            });
        }

        setup_input_handlers(&canvas, game.clone(), service.clone());
        setup_focus_handlers(game.clone());

        // Start game loop
        request_animation_frame(game, service);

        log::info!("Missile Commander running!");
    }

    /// Ask the leaderboard whether a finished run qualifies
    fn poll_high_score_check(game: &Rc<RefCell<Game>>, service: &Rc<Service>) {
        let score = {
            let mut g = game.borrow_mut();
            if g.checking || g.attract {
                return;
            }
            let Some(score) = g.state.pending_high_score_check() else {
                return;
            };
            g.checking = true;
            score
        };

        let game = game.clone();
        let service = service.clone();
        wasm_bindgen_futures::spawn_local(async move {
            let qualifies = service.check_high_score(score).await;
            let mut g = game.borrow_mut();
            g.checking = false;
            g.state.resolve_high_score_check(qualifies);
        });
    }

    fn submit_initials(game: &Rc<RefCell<Game>>, service: &Rc<Service>) {
        let submission = {
            let mut g = game.borrow_mut();
            let initials = g.initials.clone();
            g.state.submit_initials(&initials)
        };
        let Some(submission) = submission else { return };

        let game = game.clone();
        let service = service.clone();
        wasm_bindgen_futures::spawn_local(async move {
            let scores = service.submit_high_score(&submission).await;
            game.borrow_mut().state.finish_high_score_entry(scores);
        });
    }

    fn setup_input_handlers(canvas: &HtmlCanvasElement, game: Rc<RefCell<Game>>, service: Rc<Service>) {
        // Pointer down - start a game or fire
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: PointerEvent| {
                event.prevent_default();
                let mut g = game.borrow_mut();
                if g.attract || matches!(g.state.phase, GamePhase::Menu | GamePhase::GameOver) {
                    g.start(false);
                } else if g.state.phase == GamePhase::Playing {
                    g.fire(event.offset_x() as f32, event.offset_y() as f32);
                }
            });
            let _ = canvas
                .add_event_listener_with_callback("pointerdown", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Keyboard
        {
            let Some(window) = web_sys::window() else { return };
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                let key = event.key();
                let phase = game.borrow().state.phase;
                if phase == GamePhase::EnterHighScore && !game.borrow().attract {
                    match key.as_str() {
                        "Enter" => submit_initials(&game, &service),
                        "Backspace" => {
                            game.borrow_mut().initials.pop();
                        }
                        k if k.len() == 1 => {
                            let mut g = game.borrow_mut();
                            let c = k.chars().next().map(|c| c.to_ascii_uppercase());
                            if let Some(c) = c.filter(|c| c.is_ascii_uppercase())
                                && g.initials.len() < MAX_INITIALS
                            {
                                g.initials.push(c);
                            }
                        }
                        _ => {}
                    }
                    return;
                }

                let mut g = game.borrow_mut();
                match key.as_str() {
                    " " | "Enter" => {
                        if g.attract || matches!(phase, GamePhase::Menu | GamePhase::GameOver) {
                            g.start(false);
                        }
                    }
                    "m" | "M" => g.toggle_sound(),
                    "a" | "A" if matches!(phase, GamePhase::Menu | GamePhase::GameOver) || g.attract => {
                        let attract = !g.attract;
                        if attract {
                            g.start(true);
                        } else {
                            g.to_menu();
                        }
                    }
                    _ => {}
                }
            });
            let _ = window
                .add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn setup_focus_handlers(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else { return };

        for (event_name, muted) in [("blur", true), ("focus", false)] {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::FocusEvent| {
                let mut g = game.borrow_mut();
                if g.settings.mute_on_blur {
                    g.audio.set_muted(muted);
                }
            });
            let _ = window
                .add_event_listener_with_callback(event_name, closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn request_animation_frame(game: Rc<RefCell<Game>>, service: Rc<Service>) {
        let Some(window) = web_sys::window() else { return };
        let closure = Closure::once(move |time: f64| {
            game_loop(game, service, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(game: Rc<RefCell<Game>>, service: Rc<Service>, time: f64) {
        {
            let mut g = game.borrow_mut();

            // Calculate delta time
            let dt = if g.last_time > 0.0 {
                (time - g.last_time).clamp(0.0, MAX_FRAME_MS)
            } else {
                0.0
            };
            g.last_time = time;

            g.update(dt, time);
            g.render();
            if let Some(document) = web_sys::window().and_then(|w| w.document()) {
                g.update_hud(&document);
            }
        }

        poll_high_score_check(&game, &service);
        request_animation_frame(game, service);
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn wasm_main() {
    wasm_game::run().await;
}

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use std::error::Error;
    use std::path::PathBuf;
    use std::rc::Rc;

    use futures::executor::block_on;

    use missile_commander::audio::AudioManager;
    use missile_commander::autopilot::Autopilot;
    use missile_commander::highscores::{HighScoreEntry, format_date};
    use missile_commander::leaderboard::{HighScoreService, InMemoryLeaderboard, Leaderboard};
    use missile_commander::persistence::FileStorage;
    use missile_commander::platform;
    use missile_commander::sim::{GameEvent, GamePhase, GameState};
    use missile_commander::{Settings, Tuning};

    /// Fixed simulation step for the headless run (ms)
    const STEP_MS: f64 = 1000.0 / 60.0;
    /// Give up after this much simulated time (ms)
    const MAX_RUN_MS: f64 = 30.0 * 60.0 * 1000.0;

    struct Options {
        seed: u64,
        tuning: Option<PathBuf>,
        data_dir: PathBuf,
        initials: String,
        toggle_sound: bool,
    }

    fn parse_args() -> Result<Options, Box<dyn Error>> {
        let mut options = Options {
            seed: platform::unix_time_ms() as u64,
            tuning: None,
            data_dir: PathBuf::from(".missile-commander"),
            initials: "CPU".to_string(),
            toggle_sound: false,
        };
        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            let mut value = || args.next().ok_or_else(|| format!("missing value for {arg}"));
            match arg.as_str() {
                "--seed" => options.seed = value()?.parse()?,
                "--tuning" => options.tuning = Some(PathBuf::from(value()?)),
                "--data" => options.data_dir = PathBuf::from(value()?),
                "--initials" => options.initials = value()?,
                "--toggle-sound" => options.toggle_sound = true,
                other => return Err(format!("unknown argument: {other}").into()),
            }
        }
        Ok(options)
    }

    pub fn run() -> Result<(), Box<dyn Error>> {
        let options = parse_args()?;

        let mut settings_store = FileStorage::new(&options.data_dir)?;
        let mut settings = Settings::load(&settings_store);
        if options.toggle_sound {
            settings.toggle_sound();
            settings.save(&mut settings_store)?;
        }
        let mut audio = AudioManager::with_seed(options.seed);
        audio.apply_settings(&settings);

        let tuning = match &options.tuning {
            Some(path) => Tuning::from_json(&std::fs::read_to_string(path)?)?,
            None => Tuning::default(),
        };

        let service = HighScoreService::new(
            InMemoryLeaderboard::new(),
            Box::new(FileStorage::new(&options.data_dir)?),
        );
        let subscription = service
            .leaderboard()
            .subscribe(Rc::new(|top: &[HighScoreEntry]| {
                log::info!("Leaderboard updated: {} entries", top.len());
            }));

        let mut state = GameState::with_tuning(options.seed, tuning);
        state.set_high_scores(block_on(service.load_high_scores()));
        state.start_game();
        log::info!("Autopilot run with seed {}", options.seed);

        let mut autopilot = Autopilot::default();
        let mut elapsed = 0.0;
        while state.phase == GamePhase::Playing && elapsed < MAX_RUN_MS {
            state.update_game(STEP_MS);
            autopilot.update(&mut state);
            let events = state.take_events();
            audio.play_events(&events);
            for event in &events {
                if let GameEvent::WaveStarted { level, missiles } = event {
                    log::info!("Wave {}: {} missiles", level, missiles);
                }
            }
            elapsed += STEP_MS;
        }
        if state.phase == GamePhase::Playing {
            log::warn!("Run still going after {:.0} s, ending it", elapsed / 1000.0);
            state.end_game();
        }

        if let Some(score) = state.pending_high_score_check() {
            let qualifies = block_on(service.check_high_score(score));
            state.resolve_high_score_check(qualifies);
        }
        if let Some(submission) = state.submit_initials(&options.initials) {
            let scores = block_on(service.submit_high_score(&submission));
            state.finish_high_score_entry(scores);
        } else if state.phase == GamePhase::EnterHighScore {
            return Err(format!("invalid initials: {:?}", options.initials).into());
        }
        service.leaderboard().unsubscribe(subscription);

        println!("Game over: {} points, level {}", state.score, state.level);
        let now = platform::unix_time_ms();
        for (i, e) in state.high_scores.entries.iter().enumerate() {
            println!(
                "{:>2}. {:<3} {:>8}  L{:<2} {}",
                i + 1,
                e.initials,
                e.score,
                e.level,
                format_date(e.timestamp, now)
            );
        }
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Missile Commander (native) starting...");

    if let Err(e) = native::run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}
