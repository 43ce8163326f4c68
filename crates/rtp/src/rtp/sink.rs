//! The seams the packetizer and depacketizer sit on top of. A
//! [`crate::session::MediaSession`] implements both; tests and the bridge can swap
//! in anything that moves whole packets.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;

use super::packet::RtpPacket;

/// Something that can accept one fully-built RTP packet at a time.
#[async_trait]
pub trait RtpWriter: Send + Sync {
    async fn write_rtp(&self, packet: &RtpPacket) -> Result<()>;
}

/// Something that can hand back one fully-parsed RTP packet at a time.
#[async_trait]
pub trait RtpReader: Send + Sync {
    async fn read_rtp(&self) -> Result<RtpPacket>;
}

#[async_trait]
impl<T: RtpWriter + ?Sized> RtpWriter for Arc<T> {
    async fn write_rtp(&self, packet: &RtpPacket) -> Result<()> {
        (**self).write_rtp(packet).await
    }
}

#[async_trait]
impl<T: RtpReader + ?Sized> RtpReader for Arc<T> {
    async fn read_rtp(&self) -> Result<RtpPacket> {
        (**self).read_rtp().await
    }
}
