//! Stable, non-owning handles used everywhere a back-pointer
//! (`view -> output`, `view -> root`, node -> list) would otherwise force
//! ownership onto the wrong entity. Every cross-link in this crate is one
//! of these, never a raw parent pointer or `Rc`.

slotmap::new_key_type! {
    /// Identifies a `View` owned by `Root::views`.
    pub struct ViewId;

    /// Identifies an `Output` owned by `Root::outputs`.
    pub struct OutputId;

    /// Identifies a `Seat` owned by `Root::seats`.
    pub struct SeatId;

    /// Identifies a node inside a single `ViewStack`'s arena.
    pub struct NodeId;

    /// Identifies a bound layout-client object (one `mosaic_layout_v1`).
    pub struct LayoutClientId;
}
