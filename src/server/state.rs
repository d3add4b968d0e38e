use crate::overlay::{LayoutConfig, OverlayStyle, SystemFontLoader};

use super::fetch::ImageFetcher;

pub(crate) struct ServerState {
    pub(crate) layout: LayoutConfig,
    pub(crate) style: OverlayStyle,
    pub(crate) fonts: SystemFontLoader,
    pub(crate) fetcher: ImageFetcher,
}
