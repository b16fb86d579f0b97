//! Cursor image rendering: either the current xcursor theme's `default`
//! glyph, or a client-provided surface set via `wl_pointer.set_cursor`.

use std::env::var;
use std::fs::File;
use std::io::Read as _;

use smithay::backend::allocator::Fourcc;
use smithay::backend::renderer::element::surface::{
    render_elements_from_surface_tree, WaylandSurfaceRenderElement,
};
use smithay::backend::renderer::element::texture::{TextureBuffer, TextureRenderElement};
use smithay::backend::renderer::element::AsRenderElements;
use smithay::backend::renderer::{ImportAll, ImportMem, Renderer, Texture};
use smithay::input::pointer::CursorImageStatus;
use smithay::render_elements;
use smithay::utils::{Physical, Point, Scale, Transform};
use xcursor::parser::parse_xcursor;
use xcursor::CursorTheme;

/// Renders either the themed cursor glyph or whatever surface the focused
/// client set as its own cursor image.
pub struct PointerElement<T: Texture> {
    texture: Option<TextureBuffer<T>>,
    status: CursorImageStatus,
}

impl<T: Texture> Default for PointerElement<T> {
    fn default() -> Self {
        Self {
            texture: None,
            status: CursorImageStatus::default_named(),
        }
    }
}

impl<T: Texture> PointerElement<T> {
    /// Loads the `default` glyph out of `$XCURSOR_THEME` (`$XCURSOR_SIZE`
    /// pixels, falling back to 24) and imports its first frame as a GPU
    /// texture. Animated cursors are not distinguished past their first
    /// frame — tracking cursor *motion* is this crate's concern, tracking
    /// cursor *rendering* beyond the first frame is not.
    pub fn new<R>(renderer: &mut R) -> Self
    where
        R: Renderer<TextureId = T> + ImportMem,
    {
        let theme_name = var("XCURSOR_THEME").unwrap_or_else(|_| "default".to_string());
        let size = var("XCURSOR_SIZE")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(24);

        let texture = load_default_cursor_texture(renderer, &theme_name, size);

        Self {
            texture,
            status: CursorImageStatus::default_named(),
        }
    }

    pub fn set_status(&mut self, status: CursorImageStatus) {
        self.status = status;
    }
}

fn load_default_cursor_texture<R>(renderer: &mut R, theme_name: &str, size: u32) -> Option<TextureBuffer<R::TextureId>>
where
    R: Renderer + ImportMem,
{
    let theme = CursorTheme::load(theme_name);
    let path = theme.load_icon("default").ok()?;
    let mut file = File::open(path).ok()?;
    let mut data = Vec::new();
    file.read_to_end(&mut data).ok()?;

    let image = parse_xcursor(&data)?
        .into_iter()
        .find(|image| image.width == size && image.height == size)?;

    let texture = renderer
        .import_memory(
            &image.pixels_rgba,
            Fourcc::Argb8888,
            (size as i32, size as i32).into(),
            false,
        )
        .ok()?;
    Some(TextureBuffer::from_texture(renderer, texture, 1, Transform::Normal, None))
}

render_elements! {
    pub PointerRenderElement<R> where R: ImportAll;
    Surface = WaylandSurfaceRenderElement<R>,
    Texture = TextureRenderElement<<R as Renderer>::TextureId>,
}

impl<T: Texture + Clone + 'static, R> AsRenderElements<R> for PointerElement<T>
where
    R: Renderer<TextureId = T> + ImportAll,
{
    type RenderElement = PointerRenderElement<R>;

    fn render_elements<E>(
        &self,
        renderer: &mut R,
        location: Point<i32, Physical>,
        scale: Scale<f64>,
        alpha: f32,
    ) -> Vec<E>
    where
        E: From<PointerRenderElement<R>>,
    {
        match &self.status {
            CursorImageStatus::Hidden => vec![],
            CursorImageStatus::Named(_) => match self.texture.as_ref() {
                Some(texture) => {
                    vec![PointerRenderElement::<R>::from(TextureRenderElement::from_texture_buffer(
                        location.to_f64(),
                        texture,
                        None,
                        None,
                        None,
                    ))
                    .into()]
                }
                None => vec![],
            },
            CursorImageStatus::Surface(surface) => {
                render_elements_from_surface_tree(renderer, surface, location, scale, alpha)
                    .into_iter()
                    .map(E::from)
                    .collect()
            }
        }
    }
}
