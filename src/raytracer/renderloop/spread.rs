/// One neighborhood offset of the spread stencil. A neighbor of a pixel
/// sampled for quality is budgeted up to `samples / div` of that pixel.
pub struct SpreadEntry {
    pub dx: i8,
    pub dy: i8,
    pub div: f32,
}

/// Disc-shaped stencil whose radius shrinks as the quality threshold grows:
/// early noisy passes diffuse effort widely, later passes concentrate it.
pub fn build_sample_spread(step_q: f32) -> Vec<SpreadEntry> {
    let radius: i32 = if step_q <= 0.49 {
        8
    } else if step_q <= 1.99 {
        4
    } else if step_q <= 3.99 {
        2
    } else {
        1
    };

    let mut spread = Vec::new();
    for i in -radius..=radius {
        for j in -radius..=radius {
            if i == 0 && j == 0 {
                continue;
            }
            let entry = SpreadEntry {
                dx: i as i8,
                dy: j as i8,
                div: 2.0,
            };
            if radius == 1 {
                spread.push(entry);
            } else {
                let dist = ((i * i + j * j) as f32).sqrt();
                if dist <= radius as f32 {
                    spread.push(entry);
                }
            }
        }
    }
    spread
}
