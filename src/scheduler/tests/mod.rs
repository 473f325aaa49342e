mod cadence;
