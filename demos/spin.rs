use crossterm::{cursor, event, style, terminal, QueueableCommand};
use fixpipe::{
    extra::{
        ascii::{term_char_aspect, AsciiRasterizer},
        TermInput,
    },
    *,
};
use std::io::{stdout, Write};

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::{Duration, Instant};

/// Unit cube faces: normal, then four corners in counterclockwise order seen from outside.
const CUBE: [([f32; 3], [[f32; 3]; 4]); 6] = [
    (
        [0.0, 0.0, 1.0],
        [[-1.0, -1.0, 1.0], [1.0, -1.0, 1.0], [1.0, 1.0, 1.0], [-1.0, 1.0, 1.0]],
    ),
    (
        [0.0, 0.0, -1.0],
        [[1.0, -1.0, -1.0], [-1.0, -1.0, -1.0], [-1.0, 1.0, -1.0], [1.0, 1.0, -1.0]],
    ),
    (
        [1.0, 0.0, 0.0],
        [[1.0, -1.0, 1.0], [1.0, -1.0, -1.0], [1.0, 1.0, -1.0], [1.0, 1.0, 1.0]],
    ),
    (
        [-1.0, 0.0, 0.0],
        [[-1.0, -1.0, -1.0], [-1.0, -1.0, 1.0], [-1.0, 1.0, 1.0], [-1.0, 1.0, -1.0]],
    ),
    (
        [0.0, 1.0, 0.0],
        [[-1.0, 1.0, 1.0], [1.0, 1.0, 1.0], [1.0, 1.0, -1.0], [-1.0, 1.0, -1.0]],
    ),
    (
        [0.0, -1.0, 0.0],
        [[-1.0, -1.0, -1.0], [1.0, -1.0, -1.0], [1.0, -1.0, 1.0], [-1.0, -1.0, 1.0]],
    ),
];

const FACE_COLORS: [[f32; 3]; 6] = [
    [1.0, 0.3, 0.3],
    [0.3, 1.0, 0.3],
    [0.3, 0.3, 1.0],
    [1.0, 1.0, 0.3],
    [0.3, 1.0, 1.0],
    [1.0, 0.3, 1.0],
];

fn setup(ctx: &mut Context<AsciiRasterizer>) -> fixpipe::Result<()> {
    ctx.enable(Cap::DepthTest)?;
    ctx.enable(Cap::CullFace)?;
    ctx.enable(Cap::Lighting)?;
    ctx.enable(Cap::Normalize)?;
    ctx.enable(Cap::ColorMaterial)?;
    ctx.enable(Cap::Light(LightId(0)))?;
    ctx.enable(Cap::Light(LightId(1)))?;

    ctx.light(
        LightId(0),
        LightParam::Position(Vector4::new(1.0, 1.0, 1.0, 0.0)),
    )?;
    ctx.light(
        LightId(1),
        LightParam::Position(Vector4::new(-3.0, 0.0, 2.0, 1.0)),
    )?;
    ctx.light(LightId(1), LightParam::Diffuse(Vector4::new(0.3, 0.3, 0.6, 1.0)))?;
    ctx.light(LightId(1), LightParam::LinearAttenuation(0.1))?;

    ctx.material(
        Face::Front,
        MaterialParam::Specular(Vector4::new(1.0, 1.0, 1.0, 1.0)),
    )?;
    ctx.material(Face::Front, MaterialParam::Shininess(24.0))?;
    ctx.color_material(Face::Front, ColorMaterialMode::AmbientAndDiffuse);

    Ok(())
}

fn draw_cube(ctx: &mut Context<AsciiRasterizer>) -> fixpipe::Result<()> {
    ctx.begin(PrimitiveType::Quads)?;
    for ((n, corners), c) in CUBE.iter().zip(FACE_COLORS.iter()) {
        ctx.color(c[0], c[1], c[2], 1.0);
        ctx.normal(n[0], n[1], n[2]);
        for v in corners {
            ctx.vertex3(v[0], v[1], v[2])?;
        }
    }
    ctx.end()
}

fn main() -> anyhow::Result<()> {
    let aspect = 16.0 / 9.0;

    let mut ctx = Context::new(AsciiRasterizer::new(1, 1));
    ctx.set_resize_callback(|r, w, h| {
        r.resize(w as usize, h as usize);
        Some((w, h))
    });
    setup(&mut ctx)?;

    let mut stdout = stdout();
    stdout.queue(cursor::Hide)?;
    stdout.queue(event::EnableMouseCapture)?;

    // In case we get an outside sigterm/sigint, we want to gracefully shutdown without leaving the
    // terminal in raw mode.
    let stop = Arc::new(AtomicBool::new(false));

    signal_hook::flag::register(signal_hook::consts::SIGTERM, stop.clone())?;
    signal_hook::flag::register(signal_hook::consts::SIGINT, stop.clone())?;

    terminal::enable_raw_mode()?;

    let (tx, rx) = std::sync::mpsc::channel();
    let _ = std::thread::spawn(move || {
        while let Ok(e) = event::read() {
            if tx.send(e).is_err() {
                break;
            }
        }
    });

    let mut input = TermInput::default();
    let mut frame = 0;
    let time = Instant::now();

    let (mut yaw, mut pitch, mut dist) = (0.0f32, 20.0f32, 6.0f32);
    let modes = [DrawMode::Fill, DrawMode::Line, DrawMode::Point];
    let mut mode = 0;
    let mut lighting = true;

    while !stop.load(Ordering::SeqCst) && !input.should_stop {
        let start = time.elapsed();

        let (x, y) = term_char_aspect();
        let (w, _h) = terminal::size()?;
        let w = w as usize;
        let h = (((w * x) as f32) / (aspect * y as f32)) as usize;

        const Y_OFF: u16 = 2;

        input.new_frame();
        while let Ok(e) = rx.try_recv() {
            input.event(e);
        }

        yaw += input.drag.x * 2.0;
        pitch += input.drag.y * 2.0;
        dist = (dist - input.scroll * 0.5).clamp(3.0, 30.0);

        if input.toggle_lighting {
            lighting = !lighting;
            if lighting {
                ctx.enable(Cap::Lighting)?;
            } else {
                ctx.disable(Cap::Lighting)?;
            }
        }
        if input.cycle_polygon_mode {
            mode = (mode + 1) % modes.len();
            ctx.polygon_mode(Face::FrontAndBack, modes[mode]);
        }

        ctx.viewport(0, 0, w as i32, h.max(1) as i32)?;
        ctx.rasterizer_mut().clear();

        ctx.matrix_mode(MatrixMode::Projection);
        ctx.load_identity();
        ctx.frustum(-aspect * 0.5, aspect * 0.5, -0.5, 0.5, 1.0, 100.0)?;

        ctx.matrix_mode(MatrixMode::ModelView);
        ctx.load_identity();
        ctx.translate(0.0, 0.0, -dist);
        ctx.rotate(pitch, 1.0, 0.0, 0.0);
        ctx.rotate(yaw + start.as_secs_f32() * 40.0, 0.0, 1.0, 0.0);

        ctx.push_matrix()?;
        ctx.rotate(start.as_secs_f32() * 25.0, 1.0, 0.0, 1.0);
        draw_cube(&mut ctx)?;
        ctx.pop_matrix()?;

        let rendered = time.elapsed();

        let r = ctx.rasterizer();
        for (y, row) in r.rows().enumerate() {
            stdout.queue(cursor::MoveTo(0, y as u16 + Y_OFF))?;
            for cell in row {
                stdout.queue(style::SetForegroundColor(style::Color::AnsiValue(
                    cell.ansi256(),
                )))?;
                stdout.queue(style::Print(cell.ch as char))?;
            }
        }

        let drawn = time.elapsed();

        stdout.queue(cursor::MoveTo(0, 0))?;
        stdout.queue(style::SetForegroundColor(style::Color::White))?;
        stdout.queue(terminal::Clear(terminal::ClearType::CurrentLine))?;

        let v = format!(
            "{frame} {:.02}FPS ({:.02}ms render, {:.02}ms draw) {:?} lighting={lighting} [drag: rotate, scroll: zoom, l: lighting, m: mode, q: quit]",
            1.0 / (drawn - start).as_secs_f32().max(1e-6),
            (rendered - start).as_secs_f32() * 1000.0,
            (drawn - rendered).as_secs_f32() * 1000.0,
            modes[mode],
        );
        stdout.queue(style::Print(v))?;

        stdout.flush()?;

        if let Some(e) = ctx.take_error() {
            stdout.queue(cursor::MoveTo(0, 1))?;
            stdout.queue(style::Print(format!("error: {e}")))?;
        }

        let frametime_target = Duration::from_millis(16);
        let drawn_delta = time.elapsed() - start;

        if drawn_delta < frametime_target {
            std::thread::sleep(frametime_target - drawn_delta);
        }

        frame += 1;
    }

    terminal::disable_raw_mode()?;

    stdout.queue(style::ResetColor)?;
    stdout.queue(event::DisableMouseCapture)?;
    stdout.queue(cursor::Show)?;
    stdout.flush()?;

    Ok(())
}
