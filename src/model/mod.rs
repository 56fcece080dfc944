mod local;
mod remote;

pub use local::{ChargeState, LocalCampaign, LocalPost, ModerationState};
pub use remote::{
    CreativeRef, Named, RemoteCampaign, RemoteCreative, RemoteEntity, RemoteFlight, RemoteKind,
    RemoteMap,
};
