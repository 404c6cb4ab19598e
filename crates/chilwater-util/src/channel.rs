//! Analog input channels of the MCP3008

/// Inputs on one MCP3008
pub const ADC_CHANNEL_COUNT: u8 = 8;

/// Parse an MCP3008 channel number, `None` when out of range
pub fn parse_adc_channel(s: &str) -> Option<u8> {
    s.trim()
        .parse::<u8>()
        .ok()
        .filter(|ch| *ch < ADC_CHANNEL_COUNT)
}
