/// Kernel sizes and pass counts for one region at a given blur intensity.
///
/// Lower intensity means a larger kernel, more passes and, for the three
/// strongest settings, a block-pixelation pass on top of the blur.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlurParams {
    pub kernel_x: usize,
    pub kernel_y: usize,
    pub passes: usize,
    pub pixel_block: Option<usize>,
}

impl BlurParams {
    pub fn for_region(width: usize, height: usize, intensity: u8) -> Self {
        let intensity = intensity.clamp(1, 10) as usize;
        let divisor = intensity + 1;
        Self {
            kernel_x: odd_kernel(width / divisor),
            kernel_y: odd_kernel(height / divisor),
            passes: 1 + (10usize.saturating_sub(intensity)).max(1),
            pixel_block: (intensity <= 3).then(|| 12 - 2 * intensity),
        }
    }
}

fn odd_kernel(k: usize) -> usize {
    k.max(1) | 1
}

/// Runs the full blur recipe described by `params` over an ROI buffer.
pub fn blur_roi(
    roi: &mut [u8],
    width: usize,
    height: usize,
    channels: usize,
    params: &BlurParams,
    temp: &mut Vec<u32>,
) {
    for _ in 0..params.passes {
        box_blur(roi, width, height, channels, params.kernel_x, params.kernel_y, temp);
    }
    if let Some(block) = params.pixel_block {
        pixelate(roi, width, height, channels, block);
    }
}

/// Separable box blur with edge clamping, one pass per axis.
///
/// Uses running sums, so the cost is independent of the kernel size.
/// Kernel sizes must be odd; a size of 1 leaves that axis untouched.
pub fn box_blur(
    data: &mut [u8],
    width: usize,
    height: usize,
    channels: usize,
    kernel_x: usize,
    kernel_y: usize,
    temp: &mut Vec<u32>,
) {
    if width == 0 || height == 0 {
        return;
    }
    debug_assert!(kernel_x % 2 == 1 && kernel_y % 2 == 1);
    temp.resize(width.max(height) * channels, 0);

    if kernel_x > 1 {
        let half = (kernel_x / 2) as isize;
        let k = kernel_x as u32;
        for y in 0..height {
            let row = &mut data[y * width * channels..(y + 1) * width * channels];
            blur_line(row, width, channels, 1, half, k, temp);
        }
    }

    if kernel_y > 1 {
        let half = (kernel_y / 2) as isize;
        let k = kernel_y as u32;
        for x in 0..width {
            let column = &mut data[x * channels..];
            blur_line(column, height, channels, width, half, k, temp);
        }
    }
}

/// Blurs `len` pixels spaced `stride` pixels apart, starting at `line[0]`.
fn blur_line(
    line: &mut [u8],
    len: usize,
    channels: usize,
    stride: usize,
    half: isize,
    k: u32,
    temp: &mut [u32],
) {
    let at = |i: isize| (i.clamp(0, len as isize - 1) as usize) * stride * channels;

    for c in 0..channels {
        let mut sum: u32 = (-half..=half).map(|i| u32::from(line[at(i) + c])).sum();
        for i in 0..len {
            temp[i * channels + c] = (sum + k / 2) / k;
            let leaving = u32::from(line[at(i as isize - half) + c]);
            let entering = u32::from(line[at(i as isize + half + 1) + c]);
            sum = sum + entering - leaving;
        }
    }

    for i in 0..len {
        let offset = i * stride * channels;
        for c in 0..channels {
            line[offset + c] = temp[i * channels + c] as u8;
        }
    }
}

/// Block pixelation: area-average downscale by `block`, then nearest-neighbour
/// upscale back to the original size. Regions smaller than one block are left
/// as they are.
pub fn pixelate(data: &mut [u8], width: usize, height: usize, channels: usize, block: usize) {
    if block <= 1 || width < block || height < block {
        return;
    }
    let (small, sw, sh) = downscale(data, width, height, channels, block);
    let upscaled = upscale_nearest(&small, sw, sh, channels, width, height);
    data.copy_from_slice(&upscaled);
}

/// Downscale an image by integer factor using area averaging.
pub fn downscale(
    data: &[u8],
    width: usize,
    height: usize,
    channels: usize,
    scale: usize,
) -> (Vec<u8>, usize, usize) {
    let new_w = width / scale;
    let new_h = height / scale;
    let mut out = vec![0u8; new_w * new_h * channels];

    for y in 0..new_h {
        for x in 0..new_w {
            for c in 0..channels {
                let mut sum = 0u32;
                for dy in 0..scale {
                    for dx in 0..scale {
                        let sy = y * scale + dy;
                        let sx = x * scale + dx;
                        sum += u32::from(data[(sy * width + sx) * channels + c]);
                    }
                }
                let count = (scale * scale) as u32;
                out[(y * new_w + x) * channels + c] = ((sum + count / 2) / count) as u8;
            }
        }
    }

    (out, new_w, new_h)
}

/// Nearest-neighbour upscale to `target_w` x `target_h`.
pub fn upscale_nearest(
    data: &[u8],
    width: usize,
    height: usize,
    channels: usize,
    target_w: usize,
    target_h: usize,
) -> Vec<u8> {
    let mut out = vec![0u8; target_w * target_h * channels];
    for y in 0..target_h {
        let sy = (y * height / target_h).min(height - 1);
        for x in 0..target_w {
            let sx = (x * width / target_w).min(width - 1);
            let src = (sy * width + sx) * channels;
            let dst = (y * target_w + x) * channels;
            out[dst..dst + channels].copy_from_slice(&data[src..src + channels]);
        }
    }
    out
}
