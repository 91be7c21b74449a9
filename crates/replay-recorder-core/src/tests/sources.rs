use crate::{
    AudioConfig, CaptureMode, OverlayConfig, RecorderError, VideoConfig,
    engine::{EngineHandle, InputSettings, OutputSource, SceneId},
    sources::{
        AUDIO_INPUT_CHANNELS, ChannelSlots, SourceManager, fit_scale, overlay_item_info,
        validate_audio_channel,
    },
    tests::fake_engine::{EngineCall, FakeEngine, FakeProbe},
};

use std::time::Duration;

fn manager() -> (SourceManager, FakeProbe) {
    let (engine, probe) = FakeEngine::new();
    let mut manager = SourceManager::new(EngineHandle::new(engine));
    manager.attach_scene(SceneId(99), 1920).unwrap();
    probe.clear_calls();
    (manager, probe)
}

fn game_capture() -> VideoConfig {
    VideoConfig {
        capture_mode: CaptureMode::GameCapture,
        ..VideoConfig::default()
    }
}

fn window_inputs(probe: &FakeProbe) -> Vec<crate::engine::InputId> {
    probe.inputs_where(|settings| matches!(settings, InputSettings::Window { .. }))
}

/// WHAT: More input devices than slots are truncated without error
/// WHY: Extra devices are a configuration smell, not a reason to stop recording
#[test]
fn given_six_input_devices_when_adding_audio_then_three_attached() {
    // Given: Six configured input devices against three slots
    let (mut manager, probe) = manager();
    let audio = AudioConfig {
        input_devices: "a,b,c,d,e,f".to_string(),
        mic_volume: 0.5,
        ..AudioConfig::default()
    };

    // When: Adding audio sources
    let result = manager.add_audio_sources(&audio);

    // Then: Exactly three attached on the input channels, each with a fader
    assert!(result.is_ok());
    let attached = manager.attached_inputs();
    assert_eq!(attached.len(), 3);
    let channels: Vec<u32> = attached.iter().map(|a| a.channel).collect();
    assert_eq!(channels, AUDIO_INPUT_CHANNELS.to_vec());
    let ids: Vec<&str> = attached.iter().map(|a| a.device_id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
    assert_eq!(
        probe.count(|c| matches!(c, EngineCall::CreateFader(_, mul) if *mul == 0.5)),
        3
    );
    assert_eq!(probe.count(|c| matches!(c, EngineCall::CreateInput(_))), 3);
}

/// WHAT: Adding audio twice replaces rather than duplicates sources
/// WHY: Host re-open and reconfiguration both call add again
#[test]
fn given_attached_audio_when_adding_again_then_previous_released() {
    // Given: One input and one output device attached
    let (mut manager, probe) = manager();
    let audio = AudioConfig {
        input_devices: "mic".to_string(),
        output_devices: "speakers".to_string(),
        ..AudioConfig::default()
    };
    manager.add_audio_sources(&audio).unwrap();

    // When: Adding the same configuration again
    manager.add_audio_sources(&audio).unwrap();

    // Then: Old sources torn down, still one of each attached
    assert_eq!(manager.attached_inputs().len(), 1);
    assert_eq!(manager.attached_outputs().len(), 1);
    assert_eq!(probe.count(|c| matches!(c, EngineCall::DestroyFader(_))), 2);
    assert_eq!(probe.count(|c| matches!(c, EngineCall::ReleaseInput(_))), 2);
    assert_eq!(
        probe.count(|c| matches!(c, EngineCall::SetOutputSource(5, None))),
        1
    );
}

/// WHAT: Removing audio with nothing attached issues no engine calls
/// WHY: Host close may arrive before audio was ever added
#[test]
fn given_no_audio_when_removing_then_no_engine_calls() {
    // Given: A manager without audio
    let (mut manager, probe) = manager();

    // When: Removing audio sources
    manager.remove_audio_sources();

    // Then: Engine untouched
    assert!(probe.calls().is_empty());
}

/// WHAT: Output devices are routed to output channels with the speaker gain
/// WHY: Loopback capture uses its own channels and gain
#[test]
fn given_output_devices_when_adding_audio_then_output_channels_used() {
    // Given: Two playback devices with speaker gain 0.8
    let (mut manager, probe) = manager();
    let audio = AudioConfig {
        output_devices: "spk-1, spk-2".to_string(),
        speaker_volume: 0.8,
        force_mono: true,
        ..AudioConfig::default()
    };

    // When: Adding audio sources
    manager.add_audio_sources(&audio).unwrap();

    // Then: Channels 5 and 6 bound, no force-mono on loopback devices
    let channels: Vec<u32> = manager.attached_outputs().iter().map(|a| a.channel).collect();
    assert_eq!(channels, vec![5, 6]);
    assert_eq!(
        probe.count(|c| matches!(c, EngineCall::SetOutputSource(5, Some(OutputSource::Input(_))))),
        1
    );
    assert_eq!(probe.count(|c| matches!(c, EngineCall::SetForceMono(_))), 0);
    assert_eq!(
        probe.count(|c| matches!(c, EngineCall::CreateFader(_, mul) if *mul == 0.8)),
        2
    );
}

/// WHAT: Force mono is applied to capture devices
/// WHY: Single-channel microphones otherwise record to one ear only
#[test]
fn given_force_mono_when_adding_inputs_then_flag_set() {
    // Given: Force mono with one input device
    let (mut manager, probe) = manager();
    let audio = AudioConfig {
        input_devices: "mic".to_string(),
        force_mono: true,
        ..AudioConfig::default()
    };

    // When: Adding audio sources
    manager.add_audio_sources(&audio).unwrap();

    // Then: The input got the mono flag
    assert_eq!(probe.count(|c| matches!(c, EngineCall::SetForceMono(_))), 1);
}

/// WHAT: Slot assignment is in list order and reports the overflow
/// WHY: Truncation is a policy, not an indexing accident
#[test]
fn given_more_ids_than_slots_when_assigning_then_first_ids_kept() {
    // Given: Three slots and four ids
    let slots = ChannelSlots::new(&[2, 3, 4]);

    // When: Assigning
    let (assigned, dropped) = slots.assign(&["a", "b", "c", "d"]);

    // Then: First three mapped to channels in order, one dropped
    assert_eq!(assigned, vec![(2, "a"), (3, "b"), (4, "c")]);
    assert_eq!(dropped, 1);
}

/// WHAT: Audio channels must lie strictly between 1 and 64
/// WHY: Channel 1 is the scene, the engine has 64 channels
#[test]
fn given_out_of_range_channels_when_validating_then_rejected() {
    // Given/When/Then: Boundaries are rejected, interior accepted
    assert!(matches!(
        validate_audio_channel(1),
        Err(RecorderError::InvalidChannel { channel: 1, .. })
    ));
    assert!(validate_audio_channel(64).is_err());
    assert!(validate_audio_channel(2).is_ok());
    assert!(validate_audio_channel(63).is_ok());
}

/// WHAT: A game window at half the output width is scaled 2x, then back to 1x
/// WHY: A resized game window must keep filling the frame
#[test]
fn given_window_width_changes_when_rescaling_then_scale_follows() {
    // Given: Game capture at 1920 output width, window reports 960
    let (mut manager, probe) = manager();
    manager.add_video_source(&game_capture()).unwrap();
    let input = window_inputs(&probe)[0];
    probe.set_width(input, 960);

    // When: Rescaling
    let first = manager.rescale_video_source().unwrap();

    // Then: Scale 2.0 applied
    assert_eq!(first, Some(2.0));
    assert_eq!(manager.video_scale(), 2.0);

    // When: The window grows to 1920
    probe.set_width(input, 1920);
    let second = manager.rescale_video_source().unwrap();

    // Then: Scale back to 1.0
    assert_eq!(second, Some(1.0));
    assert_eq!(probe.count(|c| matches!(c, EngineCall::SetScale(..))), 2);
}

/// WHAT: Width 0 and unchanged widths do not touch the scene item
/// WHY: 0 means the game is not hooked yet
#[test]
fn given_zero_or_same_width_when_rescaling_then_no_change() {
    // Given: Game capture source without frames
    let (mut manager, probe) = manager();
    manager.add_video_source(&game_capture()).unwrap();
    let input = window_inputs(&probe)[0];

    // When: Rescaling with width 0, then twice with width 1920
    let unhooked = manager.rescale_video_source().unwrap();
    probe.set_width(input, 1920);
    let same = manager.rescale_video_source().unwrap();

    // Then: No scale is applied
    assert_eq!(unhooked, None);
    assert_eq!(same, None);
    assert_eq!(probe.count(|c| matches!(c, EngineCall::SetScale(..))), 0);
}

/// WHAT: Scale is the width ratio rounded to two decimals
/// WHY: Avoid reapplying for sub-pixel noise
#[test]
fn given_widths_when_fitting_then_ratio_rounded() {
    // Given/When/Then
    assert_eq!(fit_scale(1920, 960), 2.0);
    assert_eq!(fit_scale(1920, 2560), 0.75);
    assert_eq!(fit_scale(1920, 1366), 1.41);
}

/// WHAT: The size watcher rescales game capture on its own
/// WHY: Window resizes happen at any time during a session
#[tokio::test(start_paused = true)]
async fn given_game_capture_when_window_resizes_then_watcher_rescales() {
    // Given: Game capture with the watcher running
    let (mut manager, probe) = manager();
    manager.add_video_source(&game_capture()).unwrap();
    assert!(manager.is_watching_size());
    let input = window_inputs(&probe)[0];

    // When: The window shrinks and a watch interval passes
    probe.set_width(input, 960);
    tokio::time::sleep(Duration::from_secs(6)).await;

    // Then: The scale followed
    assert_eq!(manager.video_scale(), 2.0);
}

/// WHAT: Monitor capture never starts a size watcher
/// WHY: Display size only changes through reconfiguration
#[tokio::test(start_paused = true)]
async fn given_monitor_capture_when_adding_video_then_no_watcher() {
    // Given: A manager
    let (mut manager, probe) = manager();

    // When: Adding a monitor capture source
    manager.add_video_source(&VideoConfig::default()).unwrap();

    // Then: Monitor input created, no watcher
    assert!(!manager.is_watching_size());
    assert_eq!(
        probe
            .inputs_where(|s| matches!(s, InputSettings::Monitor { .. }))
            .len(),
        1
    );
}

/// WHAT: Replacing the video source releases the previous one first
/// WHY: Two video sources must never coexist in the scene
#[tokio::test(start_paused = true)]
async fn given_video_source_when_replacing_then_previous_released() {
    // Given: A monitor capture source
    let (mut manager, probe) = manager();
    manager.add_video_source(&VideoConfig::default()).unwrap();
    let monitor = probe.inputs_where(|s| matches!(s, InputSettings::Monitor { .. }))[0];

    // When: Switching to game capture
    manager.add_video_source(&game_capture()).unwrap();

    // Then: Monitor input released before the window input was created
    let calls = probe.calls();
    let released = calls
        .iter()
        .position(|c| *c == EngineCall::ReleaseInput(monitor))
        .unwrap();
    let created = calls
        .iter()
        .position(|c| matches!(c, EngineCall::CreateInput(InputSettings::Window { .. })))
        .unwrap();
    assert!(released < created);
}

/// WHAT: Overlay crop is symmetric from the 5000x2000 canvas
/// WHY: The visible part of the image is its centre
#[test]
fn given_overlay_size_when_computing_item_then_crop_centred() {
    // Given: A 700x230 overlay at (10, 870)
    let overlay = OverlayConfig {
        enabled: true,
        x: 10,
        ..OverlayConfig::default()
    };

    // When: Computing placement
    let info = overlay_item_info(&overlay);

    // Then: (5000-700)/2 and (2000-230)/2 from each edge
    assert_eq!(info.crop.left, 2150);
    assert_eq!(info.crop.right, 2150);
    assert_eq!(info.crop.top, 885);
    assert_eq!(info.crop.bottom, 885);
    assert_eq!((info.x, info.y), (10, 870));
}

/// WHAT: A disabled overlay removes the item but keeps the image source
/// WHY: Re-enabling must not require recreating the source
#[test]
fn given_overlay_enabled_when_disabled_then_item_removed_source_kept() {
    // Given: An attached overlay
    let (mut manager, probe) = manager();
    let mut overlay = OverlayConfig {
        enabled: true,
        ..OverlayConfig::default()
    };
    manager.create_overlay_image_source(&overlay).unwrap();
    manager.add_overlay_source(&overlay).unwrap();
    assert!(manager.has_overlay_item());

    // When: Disabling the overlay
    overlay.enabled = false;
    manager.add_overlay_source(&overlay).unwrap();

    // Then: Item gone, source still there
    assert!(!manager.has_overlay_item());
    assert!(manager.has_overlay_source());
    assert_eq!(probe.count(|c| matches!(c, EngineCall::RemoveSceneItem(_))), 1);
}
